use serde::{Deserialize, Serialize};

// Endpoints
pub const ENDPOINT_START: &str = "/client/start";
pub const ENDPOINT_GET_NEXT: &str = "/client/get_next";
pub const ENDPOINT_POLL_NEXT: &str = "/client/poll_next";
pub const ENDPOINT_CLOSE: &str = "/client/close";

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
    pub accepted: bool,
    pub status: String,
    pub timestamp_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetNextRequest {
    pub session_id: String,
    pub index: u32,
}

/// `found=false` with `has_more=false` covers both "no such session" and
/// "past the end of a complete session"; `found=false` with `has_more=true`
/// is a read that timed out while the session was still open.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetNextResponse {
    pub found: bool,
    pub payload: Vec<u8>,
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollNextRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollNextResponse {
    pub ready: bool,
    pub payload: Vec<u8>,
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseResponse {
    pub success: bool,
}
