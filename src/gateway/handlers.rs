//! Client Gateway Handlers
//!
//! Axum handlers for the client surface (Start, GetNext, PollNext, Close)
//! and for the chunk ingress team leaders push into. Unknown sessions
//! answer with negative indicators, never errors.

use super::fanout::{process_session, Dispatcher};
use super::protocol::*;
use super::session::{GetNextResult, SessionStore};
use crate::control::protocol::now_ms;
use crate::control::vitals::NodeVitals;
use crate::scheduler::protocol::{PushChunkRequest, PushChunkResponse};
use crate::scheduler::types::Request;

use axum::{Extension, Json};
use std::sync::Arc;

/// Opens a session and detaches the background processor; replies before
/// any downstream work happens.
pub async fn handle_start(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(vitals): Extension<Arc<NodeVitals>>,
    Json(req): Json<Request>,
) -> Json<StartResponse> {
    vitals.record_request();
    tracing::info!(
        "Start: client request {} (green={}, pink={})",
        req.request_id,
        req.need_green,
        req.need_pink
    );

    let session_id = sessions.create_session();

    tokio::spawn(process_session(
        dispatcher,
        sessions,
        session_id.clone(),
        req,
    ));

    Json(StartResponse {
        session_id,
        accepted: true,
        status: "QUEUED".to_string(),
        timestamp_ms: now_ms(),
    })
}

pub async fn handle_get_next(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Json(req): Json<GetNextRequest>,
) -> Json<GetNextResponse> {
    let result = sessions.get_next(&req.session_id, req.index as usize).await;

    Json(match result {
        GetNextResult::Chunk { payload, has_more } => GetNextResponse {
            found: true,
            payload,
            has_more,
        },
        GetNextResult::End | GetNextResult::NotFound => GetNextResponse {
            found: false,
            payload: Vec::new(),
            has_more: false,
        },
        GetNextResult::TimedOut => GetNextResponse {
            found: false,
            payload: Vec::new(),
            has_more: true,
        },
    })
}

pub async fn handle_poll_next(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Json(req): Json<PollNextRequest>,
) -> Json<PollNextResponse> {
    Json(match sessions.poll_next(&req.session_id) {
        Some(outcome) => PollNextResponse {
            ready: outcome.ready,
            payload: outcome.payload,
            has_more: outcome.has_more,
        },
        None => PollNextResponse {
            ready: false,
            payload: Vec::new(),
            has_more: false,
        },
    })
}

pub async fn handle_close(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Json(req): Json<CloseRequest>,
) -> Json<CloseResponse> {
    Json(CloseResponse {
        success: sessions.close(&req.session_id),
    })
}

/// Chunk ingress from team leaders; shares the push-result contract with
/// the worker-to-leader hop.
pub async fn handle_push_chunk(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Json(push): Json<PushChunkRequest>,
) -> Json<PushChunkResponse> {
    dispatcher.ingest(push, &sessions);
    Json(PushChunkResponse { ok: true })
}
