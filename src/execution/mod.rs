//! Resilient Execution Client
//!
//! Statement safety, error classification, retry/backoff, token acquisition,
//! transport strategies and the bounded worker pool behind [`ExecutionClient`].

pub mod client;
pub mod error_classifier;
pub mod pool;
pub mod result;
pub mod retry;
pub mod safety;
pub mod token;
pub mod transport;

pub use client::ExecutionClient;
pub use error_classifier::{ErrorClass, ErrorClassifier};
pub use pool::WorkerPool;
pub use result::{ClientState, ExecutionMetadata, QueryResult};
pub use retry::{RetryPolicy, RetryState};
pub use safety::check_statement;
pub use token::{AccessToken, ChainedTokenProvider, StaticTokenProvider, TokenProvider};
pub use transport::{DirectTransport, ManagementTransport, RawResultSet, Session, Strategy, Transport};
