//! Job envelope for queued profile records.
//!
//! A `Job` is the sole unit stored in a queue entry: a freshly generated
//! identifier plus the untyped profile record it carries. The envelope is
//! immutable once dispatched and is not tracked by the transport after a
//! worker pops it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work: one profile record wrapped with a unique identifier.
///
/// Serialized as `{"job_id": "<uuid>", "profile_data": {...}}` on the wire.
/// Profile records are open, schema-less values; the pipeline passes them
/// through untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job, generated at dispatch time.
    pub job_id: Uuid,
    /// The profile record to analyze. Arbitrary JSON object.
    pub profile_data: serde_json::Value,
}

impl Job {
    /// Wraps a profile record in a new envelope with a fresh identifier.
    ///
    /// Dispatching the same record twice yields two distinct jobs; records
    /// are never merged or deduplicated.
    pub fn new(profile_data: serde_json::Value) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            profile_data,
        }
    }
}
