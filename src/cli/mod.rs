//! Command-line interface for profile_forge.
//!
//! Provides commands for dispatching profile records, running the worker
//! pool, and inspecting queue depths.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
