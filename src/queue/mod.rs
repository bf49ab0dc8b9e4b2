//! Queue plumbing: the job envelope and the transport it travels through.
//!
//! This module provides the distribution backbone of the pipeline:
//!
//! - **Job**: the envelope wrapping one profile record with a fresh identifier
//! - **QueueTransport**: the narrow push/blocking-pop/length interface
//! - **RedisTransport**: the production implementation over Redis lists
//! - **MemoryTransport**: an in-process implementation for tests
//!
//! # Architecture
//!
//! ```text
//!   ┌────────────┐   LPUSH    ┌───────────────────┐   BRPOP    ┌──────────┐
//!   │ Dispatcher │ ─────────► │ {prefix}:queue:{i}│ ─────────► │ Worker i │
//!   └────────────┘            └───────────────────┘            └──────────┘
//! ```
//!
//! Push and pop are atomic on the store; FIFO order holds per queue and
//! nothing is guaranteed across queues.

pub mod job;
pub mod transport;

pub use job::Job;
pub use transport::{
    queue_name, redis_url, MemoryTransport, QueueTransport, RedisTransport, TransportError,
};
