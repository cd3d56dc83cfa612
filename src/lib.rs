//! Natural-language analytics questions to SQL and Kusto, plus a resilient
//! execution client for the resulting queries.

pub mod config;
pub mod error;
pub mod execution;
pub mod kusto;
pub mod schema;
pub mod service;
pub mod translate;

pub use config::Config;
pub use error::{QueryError, Result};
pub use execution::{ExecutionClient, QueryResult};
pub use schema::{Catalog, SchemaLoader};
pub use service::QueryService;
pub use translate::{Translation, Translator};
