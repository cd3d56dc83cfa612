use nlq_bridge::config::Config;
use nlq_bridge::schema::SchemaLoader;
use nlq_bridge::service::QueryService;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlq-bridge")]
#[command(about = "Translate analytics questions into SQL or Kusto and run them")]
#[command(version)]
struct Args {
    /// Schema manifest (overrides SCHEMA_FILE_PATH)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the query a question translates to, without running it
    Translate { question: String },
    /// Translate a question and execute the resulting query
    Ask { question: String },
    /// Execute a SELECT statement as given
    Sql { query: String },
    /// List tables, columns and enums from the schema manifest
    Schema,
    /// Show the allowed values of a field
    Enum { field: String },
    /// Generate a Kusto query for the request event stream
    Kusto { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(schema) = args.schema {
        config.schema_path = schema;
    }

    let catalog = SchemaLoader::new(config.schema_path.clone()).catalog();
    let service = QueryService::with_config(catalog, config);

    let outcome = match args.command {
        Commands::Translate { question } => print_json(&service.translate(&question)),
        Commands::Ask { question } => print_json(&service.translate_and_execute(&question).await),
        Commands::Sql { query } => print_json(&service.execute_raw(&query).await),
        Commands::Schema => print_json(&service.list_schema()),
        Commands::Enum { field } => print_json(&service.get_enum(&field)),
        Commands::Kusto { question } => print_json(&service.generate_kusto(&question)),
    };

    if let Some(client) = service.client() {
        client.close();
    }
    info!("🛑 Shut down");
    outcome
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
