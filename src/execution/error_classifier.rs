//! Error Classifier
//!
//! Classifies execution errors into a taxonomy that drives retry and fallback.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution error classification taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Timeout,
    ConnectionReset,
    TransientNetwork,
    TransientServer,
    Authentication,
    Authorization,
    MalformedStatement,
    StatementSafety,
    Translation,
    Schema,
    ClientClosed,
    Unknown,
}

impl ErrorClass {
    /// Worth another attempt with the same strategy
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClass::Timeout
                | ErrorClass::ConnectionReset
                | ErrorClass::TransientNetwork
                | ErrorClass::TransientServer
        )
    }

    /// Worth trying the next transport strategy once this one is exhausted
    pub fn allows_fallback(&self) -> bool {
        self.is_retryable() || *self == ErrorClass::Unknown
    }

    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            ErrorClass::Timeout | ErrorClass::ConnectionReset | ErrorClass::TransientNetwork
        )
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Timeout => "Timeout",
            ErrorClass::ConnectionReset => "ConnectionReset",
            ErrorClass::TransientNetwork => "TransientNetwork",
            ErrorClass::TransientServer => "TransientServer",
            ErrorClass::Authentication => "Authentication",
            ErrorClass::Authorization => "Authorization",
            ErrorClass::MalformedStatement => "MalformedStatement",
            ErrorClass::StatementSafety => "StatementSafety",
            ErrorClass::Translation => "Translation",
            ErrorClass::Schema => "Schema",
            ErrorClass::ClientClosed => "ClientClosed",
            ErrorClass::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an error into the taxonomy
    pub fn classify(&self, error: &QueryError) -> ErrorClass {
        match error {
            QueryError::Timeout(_) => ErrorClass::Timeout,
            QueryError::Authentication(_) => ErrorClass::Authentication,
            QueryError::Authorization(_) => ErrorClass::Authorization,
            QueryError::MalformedStatement(_) => ErrorClass::MalformedStatement,
            QueryError::StatementSafety(_) => ErrorClass::StatementSafety,
            QueryError::Translation(_) => ErrorClass::Translation,
            QueryError::Schema(_) => ErrorClass::Schema,
            QueryError::ClientClosed => ErrorClass::ClientClosed,
            QueryError::Http { status, .. } => self.classify_status(*status),
            QueryError::Connection(msg) | QueryError::TransientExecution(msg) => {
                match self.classify_message(msg) {
                    ErrorClass::Unknown => {
                        if matches!(error, QueryError::Connection(_)) {
                            ErrorClass::TransientNetwork
                        } else {
                            ErrorClass::TransientServer
                        }
                    }
                    class => class,
                }
            }
            QueryError::Io(e) => self.classify_message(&e.to_string()),
            QueryError::Json(_) | QueryError::Config(_) => ErrorClass::Unknown,
        }
    }

    pub fn classify_status(&self, status: u16) -> ErrorClass {
        match status {
            401 => ErrorClass::Authentication,
            403 => ErrorClass::Authorization,
            400 => ErrorClass::MalformedStatement,
            408 | 504 => ErrorClass::Timeout,
            429 | 500..=599 => ErrorClass::TransientServer,
            _ => ErrorClass::Unknown,
        }
    }

    /// Pattern matching on error messages
    pub fn classify_message(&self, message: &str) -> ErrorClass {
        let msg = message.to_lowercase();

        if msg.contains("timed out") || msg.contains("timeout") {
            return ErrorClass::Timeout;
        }
        if msg.contains("reset") || msg.contains("broken pipe") || msg.contains("connection aborted") {
            return ErrorClass::ConnectionReset;
        }
        if msg.contains("connection refused")
            || msg.contains("unreachable")
            || msg.contains("dns")
            || msg.contains("temporarily unavailable")
        {
            return ErrorClass::TransientNetwork;
        }
        if msg.contains("throttl") || msg.contains("too many requests") || msg.contains("service busy") {
            return ErrorClass::TransientServer;
        }
        if msg.contains("login failed") || msg.contains("unauthorized") || msg.contains("invalid token") {
            return ErrorClass::Authentication;
        }
        if msg.contains("forbidden") || msg.contains("permission") || msg.contains("access denied") {
            return ErrorClass::Authorization;
        }
        if msg.contains("syntax") || msg.contains("invalid column") || msg.contains("invalid object name") {
            return ErrorClass::MalformedStatement;
        }

        ErrorClass::Unknown
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_codes() {
        let classifier = ErrorClassifier::new();
        assert_eq!(classifier.classify_status(401), ErrorClass::Authentication);
        assert_eq!(classifier.classify_status(403), ErrorClass::Authorization);
        assert_eq!(classifier.classify_status(400), ErrorClass::MalformedStatement);
        assert_eq!(classifier.classify_status(504), ErrorClass::Timeout);
        assert_eq!(classifier.classify_status(503), ErrorClass::TransientServer);
        assert_eq!(classifier.classify_status(507), ErrorClass::TransientServer);
        assert_eq!(classifier.classify_status(404), ErrorClass::Unknown);
    }

    #[test]
    fn test_classify_connection_errors() {
        let classifier = ErrorClassifier::new();
        let error = QueryError::Connection("Connection reset by peer".to_string());
        assert_eq!(classifier.classify(&error), ErrorClass::ConnectionReset);
        let error = QueryError::Connection("something odd".to_string());
        assert_eq!(classifier.classify(&error), ErrorClass::TransientNetwork);
        let error = QueryError::TransientExecution("Incorrect syntax near 'FROM'".to_string());
        assert_eq!(classifier.classify(&error), ErrorClass::MalformedStatement);
    }

    #[test]
    fn test_retry_and_fallback_rules() {
        assert!(ErrorClass::Timeout.is_retryable());
        assert!(ErrorClass::TransientServer.is_retryable());
        assert!(!ErrorClass::Authentication.is_retryable());
        assert!(!ErrorClass::Authentication.allows_fallback());
        assert!(!ErrorClass::Authorization.allows_fallback());
        assert!(!ErrorClass::MalformedStatement.allows_fallback());
        assert!(ErrorClass::Unknown.allows_fallback());
        assert!(!ErrorClass::Unknown.is_retryable());
    }
}
