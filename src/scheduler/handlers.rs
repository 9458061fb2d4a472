//! Team Ingress Handlers
//!
//! Axum handlers for the team leader surface: request intake from the
//! gateway, result pushes and task pulls from workers, and the team-leader
//! flavor of the control ping (heartbeats feed the scheduler registry).

use super::leader::TeamLeader;
use super::protocol::*;
use super::types::{Request, WorkerId};
use crate::control::protocol::{PingAck, PingRequest};
use crate::control::vitals::NodeVitals;

use axum::{Extension, Json};
use std::sync::Arc;

pub async fn handle_team_request(
    Extension(leader): Extension<Arc<TeamLeader>>,
    Extension(vitals): Extension<Arc<NodeVitals>>,
    Json(req): Json<Request>,
) -> Json<HandleRequestResponse> {
    vitals.record_request();
    Json(leader.handle_request(req).await)
}

pub async fn handle_push_result(
    Extension(leader): Extension<Arc<TeamLeader>>,
    Json(req): Json<PushChunkRequest>,
) -> Json<PushChunkResponse> {
    leader.receive_result(&req.from, req.result).await;
    Json(PushChunkResponse { ok: true })
}

pub async fn handle_request_task(
    Extension(leader): Extension<Arc<TeamLeader>>,
    Json(req): Json<RequestTaskRequest>,
) -> Json<RequestTaskResponse> {
    let task = leader.request_task(&WorkerId(req.worker_id));
    Json(RequestTaskResponse { task })
}

/// Heartbeat receipt at a team leader. First contact auto-registers the
/// worker; every receipt refreshes liveness and restores health.
pub async fn handle_worker_ping(
    Extension(leader): Extension<Arc<TeamLeader>>,
    Json(req): Json<PingRequest>,
) -> Json<PingAck> {
    leader.record_heartbeat(
        &WorkerId(req.from),
        req.recent_task_ms,
        req.queue_len,
        req.capacity_score,
    );
    Json(PingAck { ok: true })
}
