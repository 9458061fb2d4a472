use crate::control::protocol::{now_ms, PingAck, PingRequest, ENDPOINT_PING};
use crate::control::vitals::NodeVitals;
use crate::dataset::slot::DatasetSlot;
use crate::scheduler::protocol::{
    PushChunkRequest, RequestTaskRequest, RequestTaskResponse, ENDPOINT_PUSH_RESULT,
    ENDPOINT_REQUEST_TASK,
};
use crate::scheduler::types::{ChunkResult, Task};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Back-off between pulls when the leader has nothing for us.
const PULL_BACKOFF: Duration = Duration::from_millis(100);
/// Heartbeat cadence.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
/// Per-call timeout against the team leader.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Test-only artificial slowdown, honored on worker D only: the value is a
/// sleep in milliseconds inserted before each task, so the capacity-aware
/// rule can be watched rerouting work to faster peers.
pub const SLOWDOWN_ENV: &str = "MINI3_SLOW_D_MS";
const SLOWDOWN_NODE: &str = "D";

/// One worker process: identity, its team leader's address and the
/// single-task processing state.
pub struct WorkerRuntime {
    node_id: String,
    team: String,
    capacity_score: u32,
    leader_url: String,
    pub dataset: DatasetSlot,
    http: reqwest::Client,
    vitals: Arc<NodeVitals>,
    /// f64 bits of the last task's processing time, read by the heartbeat.
    last_task_ms: AtomicU64,
    slow_ms: Option<u64>,
}

impl WorkerRuntime {
    pub fn new(
        node_id: &str,
        team: &str,
        capacity_score: u32,
        leader_url: String,
        vitals: Arc<NodeVitals>,
    ) -> Arc<Self> {
        let slow_ms = slowdown_from_env(node_id);
        if let Some(ms) = slow_ms {
            tracing::warn!(
                "[Worker {}] artificial slowdown active: {}ms per task",
                node_id,
                ms
            );
        }

        Arc::new(Self {
            node_id: node_id.to_string(),
            team: team.to_string(),
            capacity_score,
            leader_url,
            dataset: DatasetSlot::new(),
            http: reqwest::Client::new(),
            vitals,
            last_task_ms: AtomicU64::new(0f64.to_bits()),
            slow_ms,
        })
    }

    /// Pull loop: request, process, push, repeat until shutdown.
    pub async fn run_pull_loop(self: Arc<Self>) {
        tracing::info!("[Worker {}] pull loop started", self.node_id);

        while !self.vitals.is_shutting_down() {
            match self.fetch_task().await {
                Ok(Some(task)) => {
                    tracing::debug!(
                        "[Worker {}] pulled task {}.{}",
                        self.node_id,
                        task.request_id,
                        task.chunk_id
                    );
                    let result = self.process_task(&task).await;
                    self.push_result(result).await;
                }
                Ok(None) => {
                    tokio::time::sleep(PULL_BACKOFF).await;
                }
                Err(e) => {
                    tracing::debug!("[Worker {}] pull failed: {}", self.node_id, e);
                    tokio::time::sleep(PULL_BACKOFF).await;
                }
            }
        }

        tracing::info!("[Worker {}] pull loop stopped", self.node_id);
    }

    /// Heartbeat loop, independent of the pull loop.
    pub async fn run_heartbeat_loop(self: Arc<Self>) {
        tracing::info!("[Worker {}] heartbeat loop started", self.node_id);
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.tick().await;

        while !self.vitals.is_shutting_down() {
            interval.tick().await;

            let ping = PingRequest {
                from: self.node_id.clone(),
                ts_ms: now_ms(),
                recent_task_ms: self.last_task_ms(),
                // One task at a time; the leader's view of this queue is
                // what actually drives scheduling.
                queue_len: 0,
                capacity_score: self.capacity_score,
            };

            let url = format!("{}{}", self.leader_url, ENDPOINT_PING);
            match self
                .http
                .post(&url)
                .json(&ping)
                .timeout(CALL_TIMEOUT)
                .send()
                .await
            {
                Ok(resp) => {
                    if resp.json::<PingAck>().await.map(|a| a.ok).unwrap_or(false) {
                        tracing::trace!("[Worker {}] heartbeat acked", self.node_id);
                    }
                }
                Err(e) => {
                    tracing::debug!("[Worker {}] heartbeat failed: {}", self.node_id, e);
                }
            }
        }

        tracing::info!("[Worker {}] heartbeat loop stopped", self.node_id);
    }

    /// Processes one task into its chunk. The part index is the task's
    /// chunk id, full stop; a dataset failure still produces the chunk,
    /// just with an empty payload.
    pub async fn process_task(&self, task: &Task) -> ChunkResult {
        if let Some(ms) = self.slow_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        let started = Instant::now();

        let payload = match self.dataset.get_or_load(&task.dataset_key).await {
            Ok(store) => store.extract(task.start_row as usize, task.num_rows as usize),
            Err(e) => {
                tracing::error!(
                    "[Worker {}] dataset load failed for task {}.{}: {:#}",
                    self.node_id,
                    task.request_id,
                    task.chunk_id,
                    e
                );
                Vec::new()
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.last_task_ms
            .store(elapsed_ms.to_bits(), Ordering::Relaxed);
        self.vitals.record_request();

        tracing::debug!(
            "[Worker {}] task {}.{} done: {} bytes in {:.1}ms",
            self.node_id,
            task.request_id,
            task.chunk_id,
            payload.len(),
            elapsed_ms
        );

        ChunkResult {
            request_id: task.request_id.clone(),
            part_index: task.chunk_id,
            payload,
        }
    }

    pub fn last_task_ms(&self) -> f64 {
        f64::from_bits(self.last_task_ms.load(Ordering::Relaxed))
    }

    async fn fetch_task(&self) -> anyhow::Result<Option<Task>> {
        let url = format!("{}{}", self.leader_url, ENDPOINT_REQUEST_TASK);
        let resp = self
            .http
            .post(&url)
            .json(&RequestTaskRequest {
                worker_id: self.node_id.clone(),
            })
            .timeout(CALL_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("leader answered {}", resp.status());
        }

        Ok(resp.json::<RequestTaskResponse>().await?.task)
    }

    async fn push_result(&self, result: ChunkResult) {
        let payload = PushChunkRequest {
            from: self.node_id.clone(),
            team: self.team.clone(),
            result,
        };

        let url = format!("{}{}", self.leader_url, ENDPOINT_PUSH_RESULT);
        match self
            .http
            .post(&url)
            .json(&payload)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => tracing::error!(
                "[Worker {}] leader rejected result {}.{}: {}",
                self.node_id,
                payload.result.request_id,
                payload.result.part_index,
                resp.status()
            ),
            Err(e) => tracing::error!(
                "[Worker {}] failed to push result {}.{}: {}",
                self.node_id,
                payload.result.request_id,
                payload.result.part_index,
                e
            ),
        }
    }
}

fn slowdown_from_env(node_id: &str) -> Option<u64> {
    if node_id != SLOWDOWN_NODE {
        return None;
    }
    std::env::var(SLOWDOWN_ENV).ok()?.parse().ok()
}
