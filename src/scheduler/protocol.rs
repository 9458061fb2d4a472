use super::types::{ChunkResult, Task};
use serde::{Deserialize, Serialize};

// Endpoints
pub const ENDPOINT_HANDLE_REQUEST: &str = "/team/handle_request";
pub const ENDPOINT_PUSH_RESULT: &str = "/team/push_result";
pub const ENDPOINT_REQUEST_TASK: &str = "/team/request_task";

/// Reply to HandleRequest. `expected_chunks` tells the gateway how many
/// results this team will try to deliver; zero with `ok=false` is the
/// no-healthy-workers fast-fail.
#[derive(Debug, Serialize, Deserialize)]
pub struct HandleRequestResponse {
    pub ok: bool,
    pub expected_chunks: u32,
}

/// One chunk travelling up the fabric, tagged with its producing node and
/// team. Workers push these to their team leader; team leaders push them
/// on to the gateway, which uses the team tag for fan-out accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushChunkRequest {
    pub from: String,
    pub team: String,
    pub result: ChunkResult,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushChunkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestTaskRequest {
    pub worker_id: String,
}

/// `task: None` is the empty-task token; the worker backs off and re-pulls.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestTaskResponse {
    pub task: Option<Task>,
}
