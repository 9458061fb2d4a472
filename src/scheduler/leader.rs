use super::pending::ResultBoard;
use super::protocol::{HandleRequestResponse, PushChunkRequest, ENDPOINT_PUSH_RESULT};
use super::scheduler::TeamScheduler;
use super::types::{ChunkResult, Request, Task, WorkerId};
use crate::dataset::slot::DatasetSlot;

use std::sync::Arc;
use std::time::Duration;

/// How long a team leader waits for its workers before giving up on a
/// request. Strictly shorter than the gateway fan-out deadline.
const TEAM_WAIT: Duration = Duration::from_secs(10);
/// Tasks created per registered worker on each request.
const TASKS_PER_WORKER: usize = 3;
/// Per-call timeout for pushing a chunk up to the gateway.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// The request lifecycle at one team leader: partition, schedule, collect,
/// forward. Owns the team's scheduler and result board.
pub struct TeamLeader {
    node_id: String,
    pub scheduler: TeamScheduler,
    pub results: Arc<ResultBoard>,
    pub dataset: DatasetSlot,
    gateway_url: Option<String>,
    http: reqwest::Client,
    team_wait: Duration,
}

impl TeamLeader {
    pub fn new(node_id: &str, team: &str, gateway_url: Option<String>) -> Arc<Self> {
        Self::with_timings(node_id, TeamScheduler::new(team), gateway_url, TEAM_WAIT)
    }

    /// Full-control constructor; tests pass a scheduler with shortened
    /// staleness and a small wait.
    pub fn with_timings(
        node_id: &str,
        scheduler: TeamScheduler,
        gateway_url: Option<String>,
        team_wait: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            node_id: node_id.to_string(),
            scheduler,
            results: Arc::new(ResultBoard::new()),
            dataset: DatasetSlot::new(),
            gateway_url,
            http: reqwest::Client::new(),
            team_wait,
        })
    }

    /// Request entry point. Partitions the dataset, queues the tasks and
    /// answers immediately with the expected chunk count; collection
    /// continues in the background while workers pull.
    pub async fn handle_request(self: &Arc<Self>, req: Request) -> HandleRequestResponse {
        tracing::info!(
            "[TeamLeader {}] request: {} dataset={}",
            self.node_id,
            req.request_id,
            req.dataset_key
        );

        let store = match self.dataset.get_or_load(&req.dataset_key).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(
                    "[TeamLeader {}] dataset load failed for {}: {:#}",
                    self.node_id,
                    req.request_id,
                    e
                );
                // Deliver one empty chunk so the caller sees a partial
                // result rather than a hang.
                self.forward_to_gateway(ChunkResult {
                    request_id: req.request_id.clone(),
                    part_index: 0,
                    payload: Vec::new(),
                })
                .await;
                return HandleRequestResponse {
                    ok: true,
                    expected_chunks: 1,
                };
            }
        };

        if self.scheduler.healthy_workers() == 0 {
            tracing::warn!(
                "[TeamLeader {}] no healthy workers, fast-failing request {}",
                self.node_id,
                req.request_id
            );
            return HandleRequestResponse {
                ok: false,
                expected_chunks: 0,
            };
        }

        let tasks = partition_tasks(&req, store.total_rows(), self.scheduler.registered_workers());
        let expected = tasks.len();
        tracing::info!(
            "[TeamLeader {}] {} rows -> {} task(s) for {}",
            self.node_id,
            store.total_rows(),
            expected,
            req.request_id
        );

        if expected == 0 {
            return HandleRequestResponse {
                ok: true,
                expected_chunks: 0,
            };
        }

        self.scheduler.clear_queues();
        for task in tasks {
            self.scheduler.assign(task);
        }

        let leader = self.clone();
        let request_id = req.request_id.clone();
        tokio::spawn(async move {
            leader.await_team_results(&request_id, expected).await;
        });

        HandleRequestResponse {
            ok: true,
            expected_chunks: expected as u32,
        }
    }

    /// Blocks until all expected chunks arrived or the team deadline fires,
    /// then clears the request's board entry. Chunks were already forwarded
    /// on receipt; a timeout forwards nothing extra and re-queues nothing,
    /// late finishers are forwarded on arrival and discarded downstream.
    pub async fn await_team_results(&self, request_id: &str, expected: usize) {
        let met = self
            .results
            .wait_for(request_id, expected, self.team_wait)
            .await;
        let received = self.results.take(request_id).len();

        if met {
            tracing::info!(
                "[TeamLeader {}] request {} complete ({} chunk(s))",
                self.node_id,
                request_id,
                received
            );
        } else {
            tracing::warn!(
                "[TeamLeader {}] timeout on {} after {:?}, got {}/{} chunk(s)",
                self.node_id,
                request_id,
                self.team_wait,
                received,
                expected
            );
        }
    }

    /// Result receipt from a worker: record for the waiter, forward to the
    /// gateway immediately. Duplicates append; late arrivals still flow
    /// upstream where the dead session swallows them.
    pub async fn receive_result(&self, from: &str, chunk: ChunkResult) {
        tracing::debug!(
            "[TeamLeader {}] result {}.{} from {}",
            self.node_id,
            chunk.request_id,
            chunk.part_index,
            from
        );

        self.results.push(chunk.clone());
        self.forward_to_gateway(chunk).await;
    }

    async fn forward_to_gateway(&self, chunk: ChunkResult) {
        let Some(url) = &self.gateway_url else {
            return;
        };

        let payload = PushChunkRequest {
            from: self.node_id.clone(),
            team: self.scheduler.team().to_string(),
            result: chunk,
        };

        let endpoint = format!("{}{}", url, ENDPOINT_PUSH_RESULT);
        match self
            .http
            .post(&endpoint)
            .json(&payload)
            .timeout(FORWARD_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => tracing::warn!(
                "[TeamLeader {}] gateway rejected chunk {}.{}: {}",
                self.node_id,
                payload.result.request_id,
                payload.result.part_index,
                resp.status()
            ),
            Err(e) => tracing::warn!(
                "[TeamLeader {}] failed to forward chunk {}.{}: {}",
                self.node_id,
                payload.result.request_id,
                payload.result.part_index,
                e
            ),
        }
    }

    /// Worker pull entry point.
    pub fn request_task(&self, worker_id: &WorkerId) -> Option<Task> {
        self.scheduler.request_task(worker_id)
    }

    /// Heartbeat entry point.
    pub fn record_heartbeat(
        &self,
        worker_id: &WorkerId,
        recent_task_ms: f64,
        queue_len: u32,
        capacity_score: u32,
    ) {
        self.scheduler
            .record_heartbeat(worker_id, recent_task_ms, queue_len, capacity_score);
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

/// Splits a request into `3 × registered workers` contiguous row-range
/// tasks; the last task absorbs the division remainder. Zero rows or zero
/// workers yield no tasks.
pub fn partition_tasks(req: &Request, total_rows: usize, workers: usize) -> Vec<Task> {
    let task_count = TASKS_PER_WORKER * workers;
    if task_count == 0 || total_rows == 0 {
        return Vec::new();
    }

    let base = total_rows / task_count;
    (0..task_count)
        .map(|i| {
            let start = i * base;
            let rows = if i == task_count - 1 {
                total_rows - start
            } else {
                base
            };
            Task {
                request_id: req.request_id.clone(),
                chunk_id: i as u32,
                start_row: start as u64,
                num_rows: rows as u64,
                dataset_key: req.dataset_key.clone(),
            }
        })
        .collect()
}
