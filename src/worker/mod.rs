//! Queue consumers that turn profile jobs into saved conversations.
//!
//! This module provides the consuming half of the pipeline:
//!
//! - **WorkerPool**: One worker per queue/endpoint pair, spawned as async tasks
//! - **Worker**: Pops jobs, requests completions, persists conversations
//!
//! # Architecture
//!
//! ```text
//!    ┌───────────────┐      ┌───────────────┐      ┌───────────────┐
//!    │ queue:0       │      │ queue:1       │      │ queue:N-1     │
//!    └──────┬────────┘      └──────┬────────┘      └──────┬────────┘
//!           │ BRPOP                │ BRPOP                │ BRPOP
//!           ▼                      ▼                      ▼
//!    ┌───────────────┐      ┌───────────────┐      ┌───────────────┐
//!    │   Worker 0    │      │   Worker 1    │      │  Worker N-1   │
//!    └──────┬────────┘      └──────┬────────┘      └──────┬────────┘
//!           │ POST                 │ POST                 │ POST
//!           ▼                      ▼                      ▼
//!      port 8000              port 8001             port 8000+N-1
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use profile_forge::queue::RedisTransport;
//! use profile_forge::worker::{WorkerPool, WorkerPoolConfig};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(RedisTransport::connect("redis://localhost:6379/0").await?);
//!
//! let config = WorkerPoolConfig::new(4).with_output_dir("./output");
//! let mut pool = WorkerPool::new(config, transport);
//!
//! let started = pool.start()?;
//! println!("Started {started} queue processors. Press Ctrl+C to stop.");
//!
//! // Graceful shutdown
//! pool.shutdown().await?;
//! ```

pub mod pool;

// Re-export main types for convenience
pub use pool::{PoolError, PoolStats, SharedPoolStats, Worker, WorkerPool, WorkerPoolConfig};
