//! Configuration
//!
//! Connection, schema and retry settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const SQL_SCOPE: &str = "https://database.windows.net/.default";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

#[derive(Debug, Clone)]
pub struct Config {
    /// Fully qualified SQL server host (e.g. "myserver.database.windows.net")
    pub sql_server: String,
    pub sql_database: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub management_url: String,
    pub management_api_version: String,
    pub schema_path: PathBuf,
    pub connect_timeout: Duration,
    /// Execution timeout = connect timeout * multiplier
    pub execution_timeout_multiplier: u32,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sql_server: "azuresdkbi-server.database.windows.net".to_string(),
            sql_database: "azuresdkbi".to_string(),
            subscription_id: String::new(),
            resource_group: "sdk-mgmt-bi-data".to_string(),
            management_url: "https://management.azure.com".to_string(),
            management_api_version: "2021-11-01".to_string(),
            schema_path: PathBuf::from("reference/schemas/AMEAnalytics_Schema.json"),
            connect_timeout: Duration::from_secs(30),
            execution_timeout_multiplier: 2,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            workers: 4,
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            sql_server: env_string("SQL_SERVER", defaults.sql_server),
            sql_database: env_string("SQL_DATABASE", defaults.sql_database),
            subscription_id: env_string("AZURE_SUBSCRIPTION_ID", defaults.subscription_id),
            resource_group: env_string("AZURE_RESOURCE_GROUP", defaults.resource_group),
            management_url: env_string("MANAGEMENT_URL", defaults.management_url)
                .trim_end_matches('/')
                .to_string(),
            management_api_version: env_string(
                "MANAGEMENT_API_VERSION",
                defaults.management_api_version,
            ),
            schema_path: std::env::var("SCHEMA_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.schema_path),
            connect_timeout: Duration::from_secs(env_parse("QUERY_CONNECT_TIMEOUT_SECS", 30u64)),
            execution_timeout_multiplier: env_parse("QUERY_EXECUTION_TIMEOUT_MULTIPLIER", 2u32)
                .max(1),
            max_attempts: env_parse("QUERY_MAX_ATTEMPTS", 3u32).max(1),
            initial_backoff: Duration::from_millis(env_parse("QUERY_INITIAL_BACKOFF_MS", 1000u64)),
            workers: env_parse("QUERY_WORKERS", 4usize).max(1),
        }
    }

    /// Saturates at `Duration::MAX` instead of overflowing
    pub fn execution_timeout(&self) -> Duration {
        self.connect_timeout
            .checked_mul(self.execution_timeout_multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Server name without the domain suffix, as the management plane addresses it
    pub fn server_short_name(&self) -> &str {
        self.sql_server.split('.').next().unwrap_or(&self.sql_server)
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn env_parse<T: FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
