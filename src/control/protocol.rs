use serde::{Deserialize, Serialize};

// Endpoints
pub const ENDPOINT_PING: &str = "/control/ping";
pub const ENDPOINT_STATUS: &str = "/control/status";
pub const ENDPOINT_SHUTDOWN: &str = "/control/shutdown";

/// Heartbeat. Workers piggyback their scheduler metrics on it; for other
/// senders the metric fields are zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    pub from: String,
    pub ts_ms: u64,
    pub recent_task_ms: f64,
    pub queue_len: u32,
    pub capacity_score: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingAck {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub state: String,
    pub queue_size: u32,
    pub uptime_s: u64,
    pub requests_processed: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownRequest {
    #[serde(default)]
    pub delay_s: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub acknowledged: bool,
    pub node_id: String,
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
