//! Queue transport abstraction and its Redis implementation.
//!
//! The pipeline talks to its queues through the narrow [`QueueTransport`]
//! interface: append-to-head push, blocking pop with timeout, and length
//! query. Queues are plain Redis lists; push and pop are atomic on the
//! server, so concurrent producers and consumers need no extra locking.
//!
//! # Queue naming
//!
//! Queues are addressed as `{prefix}:queue:{index}` with `index` in
//! `[0, queue_count)`. [`queue_name`] renders the convention in one place.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

/// How often the in-memory transport re-checks an empty queue.
const MEMORY_POLL_SLICE: Duration = Duration::from_millis(5);

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to the queue store.
    #[error("Queue connection failed: {0}")]
    ConnectionFailed(String),

    /// A Redis operation failed.
    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Renders the canonical queue name for a queue index.
pub fn queue_name(prefix: &str, index: usize) -> String {
    format!("{}:queue:{}", prefix, index)
}

/// Assembles a Redis connection URL from host, port and database index.
pub fn redis_url(host: &str, port: u16, db: u32) -> String {
    format!("redis://{}:{}/{}", host, port, db)
}

/// Ordered-list queue operations the pipeline depends on.
///
/// Push appends to the head of the named list; pop blocks on the tail, so
/// entries come back in push order (FIFO per queue) and each entry is
/// returned by at most one pop.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Appends a serialized payload to the head of the named queue.
    async fn push(&self, queue: &str, payload: &str) -> Result<(), TransportError>;

    /// Pops the oldest entry from the named queue, blocking until one is
    /// available or the timeout elapses.
    ///
    /// Returns `Ok(None)` when the timeout expires with the queue empty;
    /// that is the idle branch, not an error.
    async fn blocking_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, TransportError>;

    /// Returns the number of entries waiting in the named queue.
    async fn len(&self, queue: &str) -> Result<usize, TransportError>;
}

/// Redis-backed queue transport.
///
/// Uses a [`ConnectionManager`] so dropped connections are re-established
/// automatically; the manager is cloned per operation.
pub struct RedisTransport {
    redis: ConnectionManager,
}

impl RedisTransport {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionFailed` if the server is
    /// unreachable. Callers treat this as an unrecoverable startup failure.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = redis::Client::open(url)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self { redis })
    }

    /// Creates a transport from an existing connection manager.
    ///
    /// Useful when sharing a connection across components.
    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl QueueTransport for RedisTransport {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), TransportError> {
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(queue, payload).await?;
        Ok(())
    }

    async fn blocking_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, TransportError> {
        let mut conn = self.redis.clone();
        let timeout_secs = timeout.as_secs().max(1) as usize;

        // BRPOP returns (key, value) when an entry arrives, nil on timeout
        let result: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(queue)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        Ok(result.map(|(_, payload)| payload))
    }

    async fn len(&self, queue: &str) -> Result<usize, TransportError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(queue).await?;
        Ok(len)
    }
}

/// In-process queue transport backed by mutex-guarded lists.
///
/// Honors the same FIFO and pop-at-most-once semantics as the Redis
/// transport. Used by the test suite and offline smoke runs; not durable.
#[derive(Default)]
pub struct MemoryTransport {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryTransport {
    /// Creates an empty in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), TransportError> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(queue.to_string())
            .or_default()
            .push_front(payload.to_string());
        Ok(())
    }

    async fn blocking_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            {
                let mut queues = self.queues.lock().await;
                if let Some(entries) = queues.get_mut(queue) {
                    if let Some(payload) = entries.pop_back() {
                        return Ok(Some(payload));
                    }
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(MEMORY_POLL_SLICE).await;
        }
    }

    async fn len(&self, queue: &str) -> Result<usize, TransportError> {
        let queues = self.queues.lock().await;
        Ok(queues.get(queue).map_or(0, VecDeque::len))
    }
}
