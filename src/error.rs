use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transient execution error: {0}")]
    TransientExecution(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Access denied: {0}")]
    Authorization(String),

    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    #[error("Statement rejected: {0}")]
    StatementSafety(String),

    #[error("Execution client is closed")]
    ClientClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;
