//! Transport strategies
//!
//! Two ways of reaching the database, tried in order by the execution client:
//! the direct SQL query endpoint, then the management-plane query endpoint.
//! Both speak JSON over HTTPS and return the same result body.

use crate::config::{Config, MANAGEMENT_SCOPE, SQL_SCOPE};
use crate::error::{QueryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    Management,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Management => write!(f, "management"),
        }
    }
}

/// Rows as returned by the backend, before normalisation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub source: Option<String>,
}

#[async_trait]
pub trait Session: Send {
    async fn execute(&mut self, sql: &str) -> Result<RawResultSet>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Token scope this transport authenticates with
    fn scope(&self) -> &str;

    async fn connect(&self, token: &str) -> Result<Box<dyn Session>>;
}

/// Direct query endpoint on the SQL server
pub struct DirectTransport {
    client: Client,
    url: String,
    database: String,
    execution_timeout: Duration,
}

impl DirectTransport {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: format!("https://{}/api/sql/v1/query", config.sql_server),
            database: config.sql_database.clone(),
            execution_timeout: config.execution_timeout(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn strategy(&self) -> Strategy {
        Strategy::Direct
    }

    fn scope(&self) -> &str {
        SQL_SCOPE
    }

    async fn connect(&self, token: &str) -> Result<Box<dyn Session>> {
        debug!("Opening direct session to {}", self.url);
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            url: self.url.clone(),
            token: token.to_string(),
            payload: json!({
                "database": self.database,
                "timeout": self.execution_timeout.as_secs(),
            }),
            source: format!("direct:{}", self.database),
        }))
    }
}

/// Query endpoint of the management plane
pub struct ManagementTransport {
    client: Client,
    url: String,
    database: String,
}

impl ManagementTransport {
    pub fn new(client: Client, config: &Config) -> Self {
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Sql/servers/{}/databases/{}/query?api-version={}",
            config.management_url.trim_end_matches('/'),
            config.subscription_id,
            config.resource_group,
            config.server_short_name(),
            config.sql_database,
            config.management_api_version,
        );
        Self {
            client,
            url,
            database: config.sql_database.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for ManagementTransport {
    fn strategy(&self) -> Strategy {
        Strategy::Management
    }

    fn scope(&self) -> &str {
        MANAGEMENT_SCOPE
    }

    async fn connect(&self, token: &str) -> Result<Box<dyn Session>> {
        debug!("Opening management session to {}", self.url);
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            url: self.url.clone(),
            token: token.to_string(),
            payload: json!({}),
            source: format!("management:{}", self.database),
        }))
    }
}

struct HttpSession {
    client: Client,
    url: String,
    token: String,
    /// Request body without the query
    payload: Value,
    source: String,
}

#[async_trait]
impl Session for HttpSession {
    async fn execute(&mut self, sql: &str) -> Result<RawResultSet> {
        let mut body = self.payload.clone();
        if let Value::Object(map) = &mut body {
            map.insert("query".to_string(), Value::String(sql.to_string()));
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_send_error)?;
        if !status.is_success() {
            return Err(QueryError::Http {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let mut result = parse_result_body(&serde_json::from_str(&text)?)?;
        if result.source.is_none() {
            result.source = Some(self.source.clone());
        }
        Ok(result)
    }
}

fn map_send_error(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout(e.to_string())
    } else if e.is_connect() {
        QueryError::Connection(e.to_string())
    } else if let Some(status) = e.status() {
        QueryError::Http {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        QueryError::Connection(e.to_string())
    }
}

/// Read `{columns, rows, metadata.source}`; rows may be arrays or objects keyed by column
pub fn parse_result_body(body: &Value) -> Result<RawResultSet> {
    let mut columns: Vec<String> = body
        .get("columns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(|c| match c {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let raw_rows = match body.get("rows") {
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => {
            return Err(QueryError::TransientExecution(
                "Response rows are not an array".to_string(),
            ))
        }
    };

    if columns.is_empty() {
        if let Some(Value::Object(first)) = raw_rows.first() {
            columns = first.keys().cloned().collect();
        }
    }

    let rows = raw_rows
        .iter()
        .map(|row| match row {
            Value::Array(values) => values.clone(),
            Value::Object(obj) => columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                .collect(),
            other => vec![other.clone()],
        })
        .collect();

    let source = body
        .get("metadata")
        .and_then(|m| m.get("source"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(RawResultSet {
        columns,
        rows,
        source,
    })
}

/// Row arrays zipped with their column names, in column order
pub fn rows_as_maps(set: &RawResultSet) -> Vec<Map<String, Value>> {
    set.rows
        .iter()
        .map(|row| {
            set.columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), row.get(i).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}
