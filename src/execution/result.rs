//! Query Result - the uniform result shape, whichever strategy served the query

use crate::execution::error_classifier::ErrorClass;
use crate::execution::transport::{rows_as_maps, RawResultSet, Strategy};
use serde::Serialize;
use serde_json::{Map, Value};

/// Execution client states, recorded in order for each call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Idle,
    Authenticating,
    Connecting,
    Executing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionMetadata {
    pub execution_id: String,
    /// Strategy that produced the outcome
    pub strategy: Option<Strategy>,
    /// Attempts across all strategies
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub server: String,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_used: Option<String>,
    pub states: Vec<ClientState>,
}

/// Standardized query result
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub query: String,
    /// Column → value per row, in column order
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExecutionMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting: Vec<String>,
}

impl QueryResult {
    /// Create a successful result
    pub fn success(query: &str, set: &RawResultSet, metadata: ExecutionMetadata) -> Self {
        let rows: Vec<Map<String, Value>> = rows_as_maps(set)
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k, normalize_value(v))).collect())
            .collect();
        Self {
            success: true,
            query: query.to_string(),
            row_count: rows.len(),
            rows,
            error: None,
            error_message: None,
            metadata: Some(metadata),
            troubleshooting: Vec::new(),
        }
    }

    /// Create an error result
    pub fn failure(
        query: &str,
        class: ErrorClass,
        message: impl Into<String>,
        metadata: Option<ExecutionMetadata>,
    ) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            rows: Vec::new(),
            row_count: 0,
            error: Some(class),
            error_message: Some(message.into()),
            metadata,
            troubleshooting: Vec::new(),
        }
    }

    pub fn with_troubleshooting(mut self, hints: Vec<String>) -> Self {
        self.troubleshooting = hints;
        self
    }

    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Nulls, numbers, strings and booleans pass through; anything nested becomes its JSON text
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other,
    }
}

/// Hints attached once a call gives up on connection-class failures
pub fn troubleshooting_hints(class: ErrorClass) -> Vec<String> {
    let hints: &[&str] = match class {
        ErrorClass::Timeout
        | ErrorClass::ConnectionReset
        | ErrorClass::TransientNetwork
        | ErrorClass::TransientServer
        | ErrorClass::Unknown => &[
            "Check network connectivity to the SQL database",
            "Verify the SQL server and database names are correct",
            "Check if the database server is accessible",
            "Verify firewall rules allow your connection",
        ],
        ErrorClass::Authentication => &[
            "Ensure a managed identity is assigned to this resource or client credentials are set",
            "Check if AZURE_CLIENT_ID is correctly set for a user-assigned identity",
        ],
        ErrorClass::Authorization => &["Verify your account has proper database permissions"],
        _ => &[],
    };
    hints.iter().map(|h| h.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> ExecutionMetadata {
        ExecutionMetadata {
            execution_id: "id".into(),
            strategy: Some(Strategy::Direct),
            attempts: 1,
            elapsed_ms: 5,
            server: "s".into(),
            database: "d".into(),
            data_source: None,
            table_used: None,
            states: vec![ClientState::Idle, ClientState::Succeeded],
        }
    }

    #[test]
    fn test_success_normalizes_values() {
        let set = RawResultSet {
            columns: vec!["Product".into(), "Tags".into(), "Missing".into()],
            rows: vec![vec![json!("Go-SDK"), json!(["a", "b"]), Value::Null]],
            source: None,
        };
        let result = QueryResult::success("SELECT 1", &set, metadata());
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["Tags"], json!("[\"a\",\"b\"]"));
        assert_eq!(result.rows[0]["Missing"], Value::Null);
        assert_eq!(result.columns(), vec!["Product", "Tags", "Missing"]);
    }

    #[test]
    fn test_failure_serializes_error_class() {
        let result = QueryResult::failure("SELECT 1", ErrorClass::Timeout, "slow", None);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("timeout"));
        assert!(value.get("troubleshooting").is_none());
    }
}
