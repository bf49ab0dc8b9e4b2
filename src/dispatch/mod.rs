//! Round-robin dispatch of profile records onto the work queues.
//!
//! The dispatcher assigns the record at position `i` to queue `i mod N`,
//! wraps it in a [`Job`] envelope and pushes it. Assignment is deterministic
//! given input order; records carry no natural partition key, so there is no
//! hashing. A push failure skips that record and the dispatch keeps going —
//! the final report carries the successes and the failed positions so the
//! caller can decide whether to re-run the failed subset.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::queue::{queue_name, Job, QueueTransport};

/// Errors that abort a dispatch before any push happens.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The configured queue count is not a positive integer.
    #[error("Number of queues must be a positive integer (got {0})")]
    InvalidQueueCount(usize),
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of records successfully pushed.
    pub dispatched: usize,
    /// Number of records in the input.
    pub total: usize,
    /// Input positions of records whose push failed.
    pub failed_indices: Vec<usize>,
}

impl DispatchReport {
    /// Returns whether every record was pushed.
    pub fn is_complete(&self) -> bool {
        self.dispatched == self.total
    }
}

/// Distributes profile records across the work queues.
pub struct Dispatcher {
    transport: Arc<dyn QueueTransport>,
    queue_prefix: String,
}

impl Dispatcher {
    /// Creates a dispatcher that pushes through the given transport under
    /// the given queue name prefix.
    pub fn new(transport: Arc<dyn QueueTransport>, queue_prefix: impl Into<String>) -> Self {
        Self {
            transport,
            queue_prefix: queue_prefix.into(),
        }
    }

    /// Dispatches records round-robin across `queue_count` queues.
    ///
    /// Each record gets a fresh job identifier, so dispatching the same
    /// record twice produces two distinct jobs. The dispatcher does not
    /// wait for or verify consumption.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidQueueCount` for a zero queue count,
    /// before any push is attempted. Per-record push failures never abort
    /// the run; they are reported in `failed_indices`.
    pub async fn dispatch(
        &self,
        records: Vec<serde_json::Value>,
        queue_count: usize,
    ) -> Result<DispatchReport, DispatchError> {
        if queue_count == 0 {
            return Err(DispatchError::InvalidQueueCount(queue_count));
        }

        let total = records.len();
        info!(
            records = total,
            queues = queue_count,
            "Starting profile dispatch"
        );

        let mut dispatched = 0;
        let mut failed_indices = Vec::new();

        for (i, record) in records.into_iter().enumerate() {
            let target_queue = queue_name(&self.queue_prefix, i % queue_count);
            let job = Job::new(record);

            let payload = match serde_json::to_string(&job) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(position = i, error = %e, "Failed to serialize job, skipping record");
                    failed_indices.push(i);
                    continue;
                }
            };

            match self.transport.push(&target_queue, &payload).await {
                Ok(()) => {
                    info!(
                        position = i,
                        job_id = %job.job_id,
                        queue = %target_queue,
                        "Dispatched profile"
                    );
                    dispatched += 1;
                }
                Err(e) => {
                    warn!(
                        position = i,
                        queue = %target_queue,
                        error = %e,
                        "Failed to dispatch profile, skipping record"
                    );
                    failed_indices.push(i);
                }
            }
        }

        info!(dispatched, total, "Dispatch complete");

        Ok(DispatchReport {
            dispatched,
            total,
            failed_indices,
        })
    }
}
