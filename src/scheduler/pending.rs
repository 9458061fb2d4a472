use super::types::ChunkResult;
use crate::control::types::PendingSource;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Shared pending-result map: request id to the chunks received so far.
///
/// This is the wait idiom used at both the team leader and the gateway:
/// one mutex around the whole map and one notifier for all waiters. Every
/// push wakes every waiter; each waiter re-checks its own predicate
/// (`count ≥ expected`). Per-request notifiers are deliberately avoided,
/// their churn dominates at this request rate.
pub struct ResultBoard {
    results: Mutex<HashMap<String, Vec<ChunkResult>>>,
    arrived: Notify,
}

impl ResultBoard {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            arrived: Notify::new(),
        }
    }

    /// Appends a chunk under its request id and wakes all waiters.
    /// Returns the new count for that request. Duplicates append.
    pub fn push(&self, result: ChunkResult) -> usize {
        let count = {
            let mut map = self.results.lock().unwrap();
            let list = map.entry(result.request_id.clone()).or_default();
            list.push(result);
            list.len()
        };
        self.arrived.notify_waiters();
        count
    }

    pub fn count(&self, request_id: &str) -> usize {
        let map = self.results.lock().unwrap();
        map.get(request_id).map(|list| list.len()).unwrap_or(0)
    }

    /// Removes and returns everything received for `request_id`.
    pub fn take(&self, request_id: &str) -> Vec<ChunkResult> {
        let mut map = self.results.lock().unwrap();
        map.remove(request_id).unwrap_or_default()
    }

    /// Total chunks parked across all requests; feeds the Status report.
    pub fn total_pending(&self) -> usize {
        let map = self.results.lock().unwrap();
        map.values().map(|list| list.len()).sum()
    }

    /// Blocks until `request_id` has at least `expected` chunks or the
    /// deadline passes. Returns whether the expectation was met.
    ///
    /// The notified future is created before the predicate check, so a push
    /// landing between the check and the await still wakes this waiter.
    pub async fn wait_for(&self, request_id: &str, expected: usize, deadline: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + deadline;

        loop {
            let notified = self.arrived.notified();

            if self.count(request_id) >= expected {
                return true;
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }

            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                return self.count(request_id) >= expected;
            }
        }
    }
}

impl Default for ResultBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingSource for ResultBoard {
    fn pending(&self) -> usize {
        self.total_pending()
    }
}
