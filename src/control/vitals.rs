use super::types::{NodeState, PendingSource};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Per-process liveness bookkeeping shared by the control handlers and the
/// role-specific code paths.
pub struct NodeVitals {
    pub node_id: String,
    started: Instant,
    requests_processed: AtomicU64,
    shutting_down: AtomicBool,
    pending: Arc<dyn PendingSource>,
    exit: Notify,
}

impl NodeVitals {
    pub fn new(node_id: &str, pending: Arc<dyn PendingSource>) -> Arc<Self> {
        Arc::new(Self {
            node_id: node_id.to_string(),
            started: Instant::now(),
            requests_processed: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
            pending,
            exit: Notify::new(),
        })
    }

    pub fn record_request(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_processed(&self) -> u64 {
        self.requests_processed.load(Ordering::Relaxed)
    }

    pub fn uptime_s(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn pending_results(&self) -> usize {
        self.pending.pending()
    }

    pub fn state(&self) -> NodeState {
        if self.shutting_down.load(Ordering::Relaxed) {
            return NodeState::ShuttingDown;
        }
        NodeState::from_pending(self.pending_results())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Flips the node into SHUTTING_DOWN; the actual exit is signalled
    /// separately after the requested delay.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    /// Wakes whoever is blocked in `exit_requested` (the serve loop).
    pub fn signal_exit(&self) {
        self.exit.notify_waiters();
    }

    pub async fn exit_requested(&self) {
        self.exit.notified().await;
    }
}

/// Periodic alive line, one per node: state, pending depth, uptime and
/// request count. Runs until the process exits.
pub async fn run_status_log(vitals: Arc<NodeVitals>) {
    let mut interval = tokio::time::interval(STATUS_LOG_INTERVAL);
    interval.tick().await;

    let mut counter = 0u64;
    loop {
        interval.tick().await;
        counter += 1;
        tracing::info!(
            "[{}] alive #{} | state={} | pending={} | uptime={}s | requests={}",
            vitals.node_id,
            counter,
            vitals.state().as_str(),
            vitals.pending_results(),
            vitals.uptime_s(),
            vitals.requests_processed()
        );
    }
}
