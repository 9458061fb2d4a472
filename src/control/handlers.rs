//! Control Surface Handlers
//!
//! Ping, Status and Shutdown for every node. The ping handler here is the
//! plain acknowledgement used by the gateway and workers; team leaders mount
//! their own ping route so heartbeats reach the scheduler registry.

use super::protocol::*;
use super::vitals::NodeVitals;

use axum::{Extension, Json};
use std::sync::Arc;
use std::time::Duration;

pub async fn handle_ping(
    Extension(vitals): Extension<Arc<NodeVitals>>,
    Json(req): Json<PingRequest>,
) -> Json<PingAck> {
    tracing::debug!("[{}] ping from {} at {}", vitals.node_id, req.from, req.ts_ms);
    Json(PingAck { ok: true })
}

pub async fn handle_status(
    Extension(vitals): Extension<Arc<NodeVitals>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        node_id: vitals.node_id.clone(),
        state: vitals.state().as_str().to_string(),
        queue_size: vitals.pending_results() as u32,
        uptime_s: vitals.uptime_s(),
        requests_processed: vitals.requests_processed(),
        memory_bytes: process_memory_bytes(),
    })
}

/// Acknowledges immediately, then signals the serve loop to exit after the
/// requested delay so in-flight work can finish.
pub async fn handle_shutdown(
    Extension(vitals): Extension<Arc<NodeVitals>>,
    Json(req): Json<ShutdownRequest>,
) -> Json<ShutdownResponse> {
    tracing::info!(
        "[{}] shutdown requested (delay {}s)",
        vitals.node_id,
        req.delay_s
    );

    vitals.begin_shutdown();

    let vitals_exit = vitals.clone();
    tokio::spawn(async move {
        if req.delay_s > 0 {
            tokio::time::sleep(Duration::from_secs(req.delay_s)).await;
        }
        tracing::info!(
            "[{}] shutdown complete, {} requests processed",
            vitals_exit.node_id,
            vitals_exit.requests_processed()
        );
        vitals_exit.signal_exit();
    });

    Json(ShutdownResponse {
        acknowledged: true,
        node_id: vitals.node_id.clone(),
    })
}

fn process_memory_bytes() -> u64 {
    use sysinfo::System;

    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };

    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|p| p.memory()).unwrap_or(0)
}
