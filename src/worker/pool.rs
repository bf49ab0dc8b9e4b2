//! Worker pool for consuming profile jobs from Redis queues.
//!
//! This module provides a pool of workers, each bound to one queue and one
//! completion endpoint. Workers run as independent async tasks: pop a job,
//! build an analysis prompt, call the endpoint, and persist the resulting
//! conversation.
//!
//! # Features
//!
//! - One worker per queue/endpoint pair
//! - Endpoint port ceiling with per-worker skip
//! - Graceful shutdown with broadcast channel
//! - Pool statistics tracking

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::completion::{CompletionBackend, CompletionClient};
use crate::prompt::{build_prompt, random_persona, render_profile};
use crate::queue::{queue_name, Job, QueueTransport};
use crate::sink::{Conversation, ConversationSink, SinkError};

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool configuration is unusable.
    #[error("Invalid worker pool configuration: {0}")]
    InvalidConfig(String),

    /// Every worker was skipped, so the pool has nothing to run.
    #[error("No workers could be started")]
    NoWorkersStarted,

    /// Pool is already running.
    #[error("Pool is already running")]
    AlreadyRunning,

    /// Pool is not running.
    #[error("Pool is not running")]
    NotRunning,

    /// Shutdown timed out.
    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks to spawn, one per queue.
    pub num_workers: usize,
    /// Prefix for queue names.
    pub queue_prefix: String,
    /// Index of the first queue this pool consumes.
    pub queue_offset: usize,
    /// Host where the completion endpoints listen.
    pub endpoint_host: String,
    /// Port of the first completion endpoint.
    pub start_port: u16,
    /// Highest endpoint port this pool will talk to.
    pub max_port: u16,
    /// Directory where conversations are written.
    pub output_dir: PathBuf,
    /// How long a blocking pop waits when the queue is empty.
    pub poll_timeout: Duration,
    /// Pause after a queue transport error.
    pub transport_backoff: Duration,
    /// Pause after a processing error.
    pub error_backoff: Duration,
    /// Timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            queue_prefix: "profiles".to_string(),
            queue_offset: 0,
            endpoint_host: "localhost".to_string(),
            start_port: 8000,
            max_port: 8007,
            output_dir: PathBuf::from("./output"),
            poll_timeout: Duration::from_secs(1),
            transport_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

impl WorkerPoolConfig {
    /// Creates a new configuration with the specified number of workers.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Sets the queue name prefix.
    pub fn with_queue_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.queue_prefix = prefix.into();
        self
    }

    /// Sets the index of the first queue.
    pub fn with_queue_offset(mut self, offset: usize) -> Self {
        self.queue_offset = offset;
        self
    }

    /// Sets the completion endpoint host.
    pub fn with_endpoint_host(mut self, host: impl Into<String>) -> Self {
        self.endpoint_host = host.into();
        self
    }

    /// Sets the first endpoint port.
    pub fn with_start_port(mut self, port: u16) -> Self {
        self.start_port = port;
        self
    }

    /// Sets the highest usable endpoint port.
    pub fn with_max_port(mut self, port: u16) -> Self {
        self.max_port = port;
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the blocking pop timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the pause after a transport error.
    pub fn with_transport_backoff(mut self, backoff: Duration) -> Self {
        self.transport_backoff = backoff;
        self
    }

    /// Sets the pause after a processing error.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Checks that the configuration can produce a runnable pool.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.num_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "num_workers must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of workers running in the pool.
    pub num_workers: usize,
    /// Number of workers currently waiting on a completion endpoint.
    pub active_workers: usize,
    /// Total number of jobs completed successfully.
    pub jobs_completed: u64,
    /// Total number of jobs that were dropped or failed to persist.
    pub jobs_failed: u64,
    /// Average job processing duration.
    pub average_job_duration: Duration,
}

impl PoolStats {
    /// Returns the total number of jobs processed (completed + failed).
    pub fn total_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }

    /// Returns the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            return 0.0;
        }
        (self.jobs_completed as f64 / total as f64) * 100.0
    }
}

/// Shared state for tracking pool statistics.
pub struct SharedPoolStats {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
}

impl SharedPoolStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self {
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
        }
    }

    fn record_completion(&self, duration: Duration) {
        self.jobs_completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Snapshots the counters into a [`PoolStats`].
    pub fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let completed = self.jobs_completed.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);
        let active = self.active_workers.load(Ordering::SeqCst);

        let total_jobs = completed + failed;
        let average_duration = if total_jobs > 0 {
            Duration::from_millis(total_duration_ms / total_jobs)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_workers: active as usize,
            jobs_completed: completed,
            jobs_failed: failed,
            average_job_duration: average_duration,
        }
    }
}

impl Default for SharedPoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker pool that manages one worker per queue/endpoint pair.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    transport: Arc<dyn QueueTransport>,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Vec<JoinHandle<()>>,
    stats: Arc<SharedPoolStats>,
    is_running: AtomicBool,
    started_workers: usize,
}

impl WorkerPool {
    /// Creates a new worker pool over an existing queue transport.
    pub fn new(config: WorkerPoolConfig, transport: Arc<dyn QueueTransport>) -> Self {
        // Buffer size of 1 is sufficient since we only send once
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            transport,
            shutdown_tx,
            worker_handles: Vec::new(),
            stats: Arc::new(SharedPoolStats::new()),
            is_running: AtomicBool::new(false),
            started_workers: 0,
        }
    }

    /// Starts the workers.
    ///
    /// Worker `i` consumes queue `queue_offset + i` and talks to the
    /// endpoint on `start_port + i`. Workers whose endpoint port exceeds
    /// the configured maximum are skipped.
    ///
    /// # Returns
    ///
    /// The number of workers actually started.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running,
    /// or `PoolError::NoWorkersStarted` if every worker was skipped.
    pub fn start(&mut self) -> Result<usize, PoolError> {
        self.config.validate()?;

        if self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        let sink = ConversationSink::new(&self.config.output_dir);

        for i in 0..self.config.num_workers {
            let queue_index = self.config.queue_offset + i;
            let port = self.config.start_port as u32 + i as u32;

            if port > self.config.max_port as u32 {
                warn!(
                    queue_index = queue_index,
                    port = port,
                    max_port = self.config.max_port,
                    "Skipping worker: endpoint port exceeds maximum"
                );
                continue;
            }
            let port = port as u16;

            let backend = Arc::new(CompletionClient::new(&self.config.endpoint_host, port));
            let worker = Worker::new(
                format!("worker-{}", queue_index),
                queue_name(&self.config.queue_prefix, queue_index),
                port.to_string(),
                Arc::clone(&self.transport),
                backend,
                sink.clone(),
                self.shutdown_tx.subscribe(),
                &self.config,
                Arc::clone(&self.stats),
            );

            let handle = tokio::spawn(async move {
                worker.run().await;
            });

            self.worker_handles.push(handle);
        }

        let started = self.worker_handles.len();
        if started == 0 {
            return Err(PoolError::NoWorkersStarted);
        }

        self.started_workers = started;
        self.is_running.store(true, Ordering::SeqCst);
        info!(num_workers = started, "Worker pool started");

        Ok(started)
    }

    /// Gracefully shuts down all workers.
    ///
    /// Sends a shutdown signal to all workers and waits for them to finish
    /// their current jobs.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ShutdownTimeout` if workers don't stop within
    /// the configured timeout.
    pub async fn shutdown(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        info!("Initiating worker pool shutdown");

        // Send shutdown signal to all workers
        // Ignore send error - workers may have already stopped
        let _ = self.shutdown_tx.send(());

        // Wait for all workers to finish with timeout
        let shutdown_future = async {
            for handle in self.worker_handles.drain(..) {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task panicked during shutdown");
                }
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, shutdown_future).await {
            Ok(()) => {
                self.is_running.store(false, Ordering::SeqCst);
                info!("Worker pool shutdown complete");
                Ok(())
            }
            Err(_) => {
                self.is_running.store(false, Ordering::SeqCst);
                Err(PoolError::ShutdownTimeout(self.config.shutdown_timeout))
            }
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats(self.started_workers)
    }

    /// Returns whether the pool is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Returns the configured number of workers.
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }
}

/// A single worker bound to one queue and one completion endpoint.
pub struct Worker {
    /// Unique identifier for this worker.
    id: String,
    /// Name of the queue this worker consumes.
    queue_name: String,
    /// Identifier used in output filenames, the endpoint port as text.
    endpoint_id: String,
    /// Next output slot for this worker's conversations.
    sequence: u64,
    /// Queue transport used to pop jobs.
    transport: Arc<dyn QueueTransport>,
    /// Completion backend for this worker's endpoint.
    backend: Arc<dyn CompletionBackend>,
    /// Sink for completed conversations.
    sink: ConversationSink,
    /// Receiver for shutdown signal.
    shutdown_rx: broadcast::Receiver<()>,
    /// How long a blocking pop waits when the queue is empty.
    poll_timeout: Duration,
    /// Pause after a transport error.
    transport_backoff: Duration,
    /// Pause after a processing error.
    error_backoff: Duration,
    /// Shared statistics.
    stats: Arc<SharedPoolStats>,
}

impl Worker {
    /// Creates a new worker.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        queue_name: String,
        endpoint_id: String,
        transport: Arc<dyn QueueTransport>,
        backend: Arc<dyn CompletionBackend>,
        sink: ConversationSink,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerPoolConfig,
        stats: Arc<SharedPoolStats>,
    ) -> Self {
        Self {
            id,
            queue_name,
            endpoint_id,
            sequence: 1,
            transport,
            backend,
            sink,
            shutdown_rx,
            poll_timeout: config.poll_timeout,
            transport_backoff: config.transport_backoff,
            error_backoff: config.error_backoff,
            stats,
        }
    }

    /// Returns the worker's ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the next output sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Main worker loop.
    ///
    /// Continuously pops jobs and processes them until a shutdown signal
    /// is received.
    pub async fn run(mut self) {
        info!(
            worker_id = %self.id,
            queue = %self.queue_name,
            endpoint = %self.endpoint_id,
            "Worker started"
        );

        loop {
            // Check for shutdown signal (non-blocking)
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => {
                    info!(worker_id = %self.id, "Worker received shutdown signal");
                    break;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    // We missed some signals, but since it's shutdown, just check again
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    // No shutdown signal, continue processing
                }
            }

            // Try to pop a job
            match self
                .transport
                .blocking_pop(&self.queue_name, self.poll_timeout)
                .await
            {
                Ok(Some(payload)) => {
                    if let Err(e) = self.handle_payload(&payload).await {
                        error!(
                            worker_id = %self.id,
                            error = %e,
                            "Failed to persist conversation"
                        );
                        tokio::time::sleep(self.error_backoff).await;
                    }
                }
                Ok(None) => {
                    // No job available, the pop already waited poll_timeout
                    debug!(worker_id = %self.id, "No jobs available");
                }
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "Failed to pop from queue");
                    // Wait before retrying on error
                    tokio::time::sleep(self.transport_backoff).await;
                }
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }

    /// Decodes a popped payload and runs it through the job path.
    ///
    /// Payloads that are not valid jobs are logged and dropped; the queue
    /// already consumed them, so there is nothing to put back.
    async fn handle_payload(&mut self, payload: &str) -> Result<(), SinkError> {
        let started = Instant::now();

        let job: Job = match serde_json::from_str(payload) {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    worker_id = %self.id,
                    error = %e,
                    "Discarding malformed job payload"
                );
                self.stats.record_failure(started.elapsed());
                return Ok(());
            }
        };

        self.process_job(job).await
    }

    /// Processes a single job: prompt, completion, persistence.
    ///
    /// A completion failure drops the job. A persistence failure is
    /// returned to the caller and leaves the sequence number untouched,
    /// so the output slot is reused by the next successful job.
    pub async fn process_job(&mut self, job: Job) -> Result<(), SinkError> {
        let start_time = Instant::now();

        info!(
            worker_id = %self.id,
            job_id = %job.job_id,
            "Processing job"
        );

        let persona = random_persona();
        let prompt = build_prompt(persona, &render_profile(&job.profile_data));

        self.stats.increment_active();
        let completion = self.backend.complete(&prompt).await;
        self.stats.decrement_active();

        let response = match completion {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_failure(start_time.elapsed());
                warn!(
                    worker_id = %self.id,
                    job_id = %job.job_id,
                    error = %e,
                    "Discarding job after completion failure"
                );
                return Ok(());
            }
        };

        let sequence = self.sequence;
        let conversation = Conversation::from_exchange(prompt, response);

        let path = match self
            .sink
            .save(&self.endpoint_id, sequence, &conversation)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                self.stats.record_failure(start_time.elapsed());
                return Err(e);
            }
        };

        let duration = start_time.elapsed();
        self.stats.record_completion(duration);
        self.sequence += 1;

        info!(
            worker_id = %self.id,
            job_id = %job.job_id,
            sequence = sequence,
            path = %path.display(),
            duration_ms = duration.as_millis(),
            "Job completed successfully"
        );

        Ok(())
    }
}
