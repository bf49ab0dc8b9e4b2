//! profile_forge: Redis-backed profile analysis pipeline.
//!
//! This library dispatches profile records round-robin across Redis queues
//! and runs one worker per queue, each calling its own completion endpoint
//! and saving the prompt/response exchange as a JSON conversation file.

// Core modules
pub mod cli;
pub mod completion;
pub mod dataset;
pub mod dispatch;
pub mod prompt;
pub mod queue;
pub mod sink;
pub mod worker;

// Re-export commonly used error types
pub use completion::CompletionError;
pub use dataset::DatasetError;
pub use dispatch::DispatchError;
pub use queue::TransportError;
pub use sink::SinkError;
pub use worker::PoolError;
