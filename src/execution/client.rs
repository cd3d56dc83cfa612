//! Resilient Execution Client
//!
//! `Idle → Authenticating → Connecting → Executing → {Succeeded | Failed}`.
//!
//! Each transport strategy gets a bounded retry loop with exponential backoff around
//! connect + execute; only retryable classes (timeouts, resets, transient network or
//! server faults) are retried. Authentication, authorization and malformed statements
//! end the call at once. When a strategy runs out of attempts on a recoverable failure
//! the next strategy is tried. Every outcome is a [`QueryResult`], never an `Err`.

use crate::config::Config;
use crate::error::{QueryError, Result};
use crate::execution::error_classifier::ErrorClassifier;
use crate::execution::pool::WorkerPool;
use crate::execution::result::{troubleshooting_hints, ClientState, ExecutionMetadata, QueryResult};
use crate::execution::retry::{RetryPolicy, RetryState};
use crate::execution::safety::check_statement;
use crate::execution::token::{CallTokens, ChainedTokenProvider, TokenProvider};
use crate::execution::transport::{
    DirectTransport, ManagementTransport, RawResultSet, Strategy, Transport,
};
use crate::translate::outline;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct ExecutionClient {
    transports: Vec<Arc<dyn Transport>>,
    tokens: Arc<dyn TokenProvider>,
    pool: WorkerPool,
    policy: RetryPolicy,
    connect_timeout: Duration,
    execution_timeout: Duration,
    server: String,
    database: String,
    classifier: ErrorClassifier,
}

/// Per-call bookkeeping
struct CallTrace {
    execution_id: String,
    started: Instant,
    states: Vec<ClientState>,
    attempts: u32,
    strategy: Option<Strategy>,
    table_used: Option<String>,
}

impl CallTrace {
    fn enter(&mut self, state: ClientState) {
        debug!("[{}] {:?}", self.execution_id, state);
        self.states.push(state);
    }
}

impl ExecutionClient {
    pub fn new(
        transports: Vec<Arc<dyn Transport>>,
        tokens: Arc<dyn TokenProvider>,
        config: &Config,
    ) -> Self {
        Self {
            transports,
            tokens,
            pool: WorkerPool::new(config.workers),
            policy: RetryPolicy::from_config(config),
            connect_timeout: config.connect_timeout,
            execution_timeout: config.execution_timeout(),
            server: config.sql_server.clone(),
            database: config.sql_database.clone(),
            classifier: ErrorClassifier::new(),
        }
    }

    /// Direct strategy first, then the management plane when a subscription is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| QueryError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let mut transports: Vec<Arc<dyn Transport>> =
            vec![Arc::new(DirectTransport::new(http.clone(), config))];
        if config.subscription_id.is_empty() {
            warn!("AZURE_SUBSCRIPTION_ID is not set, management-plane fallback disabled");
        } else {
            transports.push(Arc::new(ManagementTransport::new(http.clone(), config)));
        }

        let tokens = Arc::new(ChainedTokenProvider::from_env(http));
        info!(
            "✅ Execution client ready: {} ({} strategies, {} workers)",
            config.sql_server,
            transports.len(),
            config.workers
        );
        Ok(Self::new(transports, tokens, config))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, execution: Duration) -> Self {
        self.connect_timeout = connect;
        self.execution_timeout = execution;
        self
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.transports.iter().map(|t| t.strategy()).collect()
    }

    /// Release the worker pool; later calls fail with `ClientClosed`
    pub fn close(&self) {
        self.pool.close();
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Check, authenticate, execute with retries and fallback
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let mut trace = CallTrace {
            execution_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            states: vec![ClientState::Idle],
            attempts: 0,
            strategy: None,
            table_used: outline(sql).map(|o| o.table),
        };

        if self.is_closed() {
            return self.fail(sql, &mut trace, &QueryError::ClientClosed);
        }
        if let Err(e) = check_statement(sql) {
            warn!("🚫 Statement rejected: {}", e);
            return self.fail(sql, &mut trace, &e);
        }

        let mut tokens = CallTokens::new(self.tokens.as_ref());
        let mut last_error: Option<QueryError> = None;

        for (index, transport) in self.transports.iter().enumerate() {
            let strategy = transport.strategy();
            trace.strategy = Some(strategy);

            trace.enter(ClientState::Authenticating);
            let token = match tokens.get(transport.scope()).await {
                Ok(token) => token,
                Err(e) => {
                    error!("❌ Could not acquire a token for {}: {}", strategy, e);
                    let e = match e {
                        QueryError::Authentication(_) => e,
                        other => QueryError::Authentication(other.to_string()),
                    };
                    return self.fail(sql, &mut trace, &e);
                }
            };

            let mut retry = RetryState::new(&self.policy);
            let error = loop {
                let attempt = retry.begin_attempt();
                trace.attempts += 1;
                info!(
                    "🔄 {} attempt {} of {} [{}]",
                    strategy, attempt, self.policy.max_attempts, trace.execution_id
                );

                match self.attempt(transport.as_ref(), &token, sql, &mut trace).await {
                    Ok(set) => {
                        trace.enter(ClientState::Succeeded);
                        info!(
                            "✅ Query succeeded via {} after {} attempt(s), {} rows",
                            strategy,
                            trace.attempts,
                            set.rows.len()
                        );
                        let metadata = self.metadata(&trace, set.source.clone());
                        return QueryResult::success(sql, &set, metadata);
                    }
                    Err(e) => {
                        let class = self.classifier.classify(&e);
                        match retry.record_failure(&self.policy, class) {
                            Some(delay) => {
                                warn!(
                                    "⚠️  {} attempt {} failed ({}): {}; retrying in {:?}",
                                    strategy, attempt, class, e, delay
                                );
                                tokio::time::sleep(delay).await;
                            }
                            None => break e,
                        }
                    }
                }
            };

            let class = self.classifier.classify(&error);
            let has_next = index + 1 < self.transports.len();
            if class.allows_fallback() && has_next {
                warn!(
                    "⚠️  {} strategy gave up ({}): {}; falling back",
                    strategy, class, error
                );
                last_error = Some(error);
                continue;
            }
            return self.fail(sql, &mut trace, &error);
        }

        let error = last_error
            .unwrap_or_else(|| QueryError::Connection("No transport strategy is configured".to_string()));
        self.fail(sql, &mut trace, &error)
    }

    /// One connect + execute, holding a worker permit throughout
    async fn attempt(
        &self,
        transport: &dyn Transport,
        token: &str,
        sql: &str,
        trace: &mut CallTrace,
    ) -> Result<RawResultSet> {
        let _permit = self.pool.acquire().await?;

        trace.enter(ClientState::Connecting);
        let mut session = tokio::time::timeout(self.connect_timeout, transport.connect(token))
            .await
            .map_err(|_| {
                QueryError::Timeout(format!("Connection timed out after {:?}", self.connect_timeout))
            })??;

        trace.enter(ClientState::Executing);
        tokio::time::timeout(self.execution_timeout, session.execute(sql))
            .await
            .map_err(|_| {
                QueryError::Timeout(format!("Execution timed out after {:?}", self.execution_timeout))
            })?
    }

    fn metadata(&self, trace: &CallTrace, data_source: Option<String>) -> ExecutionMetadata {
        ExecutionMetadata {
            execution_id: trace.execution_id.clone(),
            strategy: trace.strategy,
            attempts: trace.attempts,
            elapsed_ms: trace.started.elapsed().as_millis() as u64,
            server: self.server.clone(),
            database: self.database.clone(),
            data_source,
            table_used: trace.table_used.clone(),
            states: trace.states.clone(),
        }
    }

    fn fail(&self, sql: &str, trace: &mut CallTrace, error: &QueryError) -> QueryResult {
        trace.enter(ClientState::Failed);
        let class = self.classifier.classify(error);
        error!("❌ Query failed ({}): {}", class, error);
        QueryResult::failure(sql, class, error.to_string(), Some(self.metadata(trace, None)))
            .with_troubleshooting(troubleshooting_hints(class))
    }
}
