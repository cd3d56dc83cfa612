//! Statement Safety
//!
//! Every statement reaching execution must be a SELECT and must not mention any
//! write/DDL keyword anywhere in its text.

use crate::error::{QueryError, Result};

pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
];

pub fn check_statement(sql: &str) -> Result<()> {
    let upper = sql.trim().to_uppercase();

    if upper.is_empty() {
        return Err(QueryError::StatementSafety("Statement is empty".to_string()));
    }
    if !upper.starts_with("SELECT") {
        return Err(QueryError::StatementSafety(
            "Only SELECT statements are allowed".to_string(),
        ));
    }
    if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        return Err(QueryError::StatementSafety(format!(
            "Statement contains forbidden keyword {}",
            keyword
        )));
    }
    Ok(())
}
