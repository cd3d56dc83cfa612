//! Worker pool
//!
//! Bounds how many connect/execute operations run at once. A permit is held only
//! while a connection is opened and a statement runs; callers waiting out a
//! backoff hold none.

use crate::error::{QueryError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::info;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a worker slot; fails once the pool is closed
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| QueryError::ClientClosed)
    }

    /// Reject new work; in-flight permits finish normally
    pub fn close(&self) {
        if !self.permits.is_closed() {
            self.permits.close();
            info!("🛑 Worker pool closed ({} workers)", self.size);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let pool = WorkerPool::new(2);
        let a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 0);
        drop(a);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let pool = WorkerPool::new(1);
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.acquire().await, Err(QueryError::ClientClosed)));
    }
}
