use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Stable worker identifier drawn from the topology document.
/// Used as the registry key; never a reference into scheduler state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One client intent, immutable after issue. `request_id` is opaque and
/// unique per client call; inside the fabric the gateway substitutes its
/// own session id so concurrent clients can reuse external ids safely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    pub dataset_key: String,
    pub need_green: bool,
    pub need_pink: bool,
}

/// One unit of scheduled work: a contiguous row range of one dataset.
/// Created when a request reaches a team leader, destroyed when the
/// matching result has been pushed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub request_id: String,
    pub chunk_id: u32,
    pub start_row: u64,
    pub num_rows: u64,
    pub dataset_key: String,
}

/// The output of one task. `part_index` always equals the task's
/// `chunk_id`; the payload may be empty (degenerate ranges, load failures).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkResult {
    pub request_id: String,
    pub part_index: u32,
    pub payload: Vec<u8>,
}

/// Per-worker bookkeeping as seen by the team leader.
///
/// `queue_len` mirrors the length of that worker's task queue and is only
/// ever written under the scheduler lock; the value a worker reports over
/// heartbeat is informational.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub capacity_score: u32,
    pub avg_task_ms: Option<f64>,
    pub queue_len: usize,
    pub last_heartbeat: Instant,
    pub healthy: bool,
}

impl WorkerStats {
    pub fn new(capacity_score: u32) -> Self {
        Self {
            capacity_score,
            avg_task_ms: None,
            queue_len: 0,
            last_heartbeat: Instant::now(),
            healthy: true,
        }
    }
}
