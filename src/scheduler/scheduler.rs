use super::types::{Task, WorkerId, WorkerStats};

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Placement score fallback when a worker has no latency measurement yet.
const DEFAULT_BASE_LATENCY_MS: f64 = 100.0;
/// Queue-depth weight in the placement score.
const QUEUE_LEN_WEIGHT: f64 = 50.0;
/// Smoothing factor of the task-latency moving average.
const EMA_ALPHA: f64 = 0.2;
/// A peer queue must exceed this depth before it can be stolen from.
const STEAL_WATERMARK: usize = 4;
/// Heartbeat silence after which a worker is marked unhealthy.
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10);
/// Diagnostics thresholds.
const WORKER_QUEUE_WARN: usize = 20;
const OVERFLOW_QUEUE_WARN: usize = 100;

/// Capacity score assigned to workers first seen outside the topology
/// document.
pub const DEFAULT_CAPACITY_SCORE: u32 = 1;
/// Cadence of the health/reassignment sweep the boot path runs.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(500);

/// Where a task ended up when placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Worker(WorkerId),
    Overflow,
}

struct SchedulerState {
    /// Authoritative count of registered workers; must always equal
    /// `workers.len()`.
    registered: usize,
    workers: HashMap<WorkerId, WorkerStats>,
    /// Registration order; breaks placement-score ties.
    order: Vec<WorkerId>,
    queues: HashMap<WorkerId, VecDeque<Task>>,
    overflow: VecDeque<Task>,
}

/// One team's scheduler: worker registry, per-worker task queues and the
/// team overflow queue, all behind a single lock.
pub struct TeamScheduler {
    team: String,
    stale_after: Duration,
    state: Mutex<SchedulerState>,
}

impl TeamScheduler {
    pub fn new(team: &str) -> Self {
        Self::with_staleness(team, DEFAULT_STALE_AFTER)
    }

    /// Constructor with a custom staleness threshold; tests shrink it to
    /// keep maintenance scenarios fast.
    pub fn with_staleness(team: &str, stale_after: Duration) -> Self {
        Self {
            team: team.to_string(),
            stale_after,
            state: Mutex::new(SchedulerState {
                registered: 0,
                workers: HashMap::new(),
                order: Vec::new(),
                queues: HashMap::new(),
                overflow: VecDeque::new(),
            }),
        }
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// Registers a worker with its configured capacity. Re-registration of a
    /// known id is a no-op.
    pub fn register_worker(&self, id: &WorkerId, capacity_score: u32) {
        let mut state = self.state.lock().unwrap();
        Self::register_locked(&mut state, &self.team, id, capacity_score);
    }

    /// First-contact registration: unknown ids get the default capacity.
    pub fn ensure_registered(&self, id: &WorkerId) {
        let mut state = self.state.lock().unwrap();
        Self::register_locked(&mut state, &self.team, id, DEFAULT_CAPACITY_SCORE);
    }

    fn register_locked(
        state: &mut SchedulerState,
        team: &str,
        id: &WorkerId,
        capacity_score: u32,
    ) {
        if state.workers.contains_key(id) {
            return;
        }

        tracing::info!(
            "[{}] registered worker {} (capacity {})",
            team,
            id,
            capacity_score
        );

        state.workers.insert(id.clone(), WorkerStats::new(capacity_score));
        state.order.push(id.clone());
        state.queues.insert(id.clone(), VecDeque::new());
        state.registered += 1;
    }

    /// Heartbeat receipt: refreshes liveness, folds the reported task
    /// latency into the moving average and restores health. The reported
    /// queue length is informational only; the authoritative depth is the
    /// queue this scheduler maintains.
    pub fn record_heartbeat(
        &self,
        id: &WorkerId,
        recent_task_ms: f64,
        reported_queue_len: u32,
        capacity_score: u32,
    ) {
        let mut state = self.state.lock().unwrap();
        Self::register_locked(&mut state, &self.team, id, capacity_score.max(1));

        let stats = state.workers.get_mut(id).unwrap();
        stats.last_heartbeat = Instant::now();
        stats.capacity_score = capacity_score.max(1);

        if recent_task_ms > 0.0 {
            stats.avg_task_ms = Some(match stats.avg_task_ms {
                Some(avg) => (1.0 - EMA_ALPHA) * avg + EMA_ALPHA * recent_task_ms,
                None => recent_task_ms,
            });
        }

        if !stats.healthy {
            tracing::info!("[{}] worker {} back to healthy", self.team, id);
            stats.healthy = true;
        }

        tracing::debug!(
            "[{}] heartbeat from {}: recent={}ms avg={:?}ms reported_queue={}",
            self.team,
            id,
            recent_task_ms,
            stats.avg_task_ms,
            reported_queue_len
        );
    }

    pub fn registered_workers(&self) -> usize {
        self.state.lock().unwrap().registered
    }

    pub fn healthy_workers(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.workers.values().filter(|s| s.healthy).count()
    }

    /// Drops every queued task, worker queues and overflow alike. Called
    /// when a new request replaces the team's workload.
    pub fn clear_queues(&self) {
        let mut state = self.state.lock().unwrap();

        let dropped: usize = state.queues.values().map(|q| q.len()).sum::<usize>()
            + state.overflow.len();
        if dropped > 0 {
            tracing::debug!("[{}] clearing {} stale queued task(s)", self.team, dropped);
        }

        for queue in state.queues.values_mut() {
            queue.clear();
        }
        state.overflow.clear();
        for stats in state.workers.values_mut() {
            stats.queue_len = 0;
        }
    }

    /// Places one task with the capacity-aware rule; falls back to the team
    /// overflow queue when no worker is healthy.
    pub fn assign(&self, task: Task) -> Placement {
        let mut state = self.state.lock().unwrap();
        Self::place_locked(&mut state, &self.team, task)
    }

    fn place_locked(state: &mut SchedulerState, team: &str, task: Task) -> Placement {
        let target = Self::best_worker_locked(state);

        match target {
            Some(id) => {
                let queue = state.queues.get_mut(&id).unwrap();
                queue.push_back(task);
                let depth = queue.len();
                state.workers.get_mut(&id).unwrap().queue_len = depth;

                tracing::debug!("[{}] placed task on {} (queue {})", team, id, depth);
                Placement::Worker(id)
            }
            None => {
                state.overflow.push_back(task);
                tracing::debug!(
                    "[{}] no healthy worker, task to overflow (depth {})",
                    team,
                    state.overflow.len()
                );
                Placement::Overflow
            }
        }
    }

    /// The healthy worker minimizing `base_latency + 50 × queue_len`, where
    /// base latency is the measured average or 100 ms before the first
    /// measurement. Ties go to the earlier-registered worker.
    fn best_worker_locked(state: &SchedulerState) -> Option<WorkerId> {
        let mut best: Option<(&WorkerId, f64)> = None;

        for id in &state.order {
            let stats = &state.workers[id];
            if !stats.healthy {
                continue;
            }

            let base = stats.avg_task_ms.unwrap_or(DEFAULT_BASE_LATENCY_MS);
            let score = base + QUEUE_LEN_WEIGHT * stats.queue_len as f64;

            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((id, score)),
            }
        }

        best.map(|(id, _)| id.clone())
    }

    /// Serves a worker pull. Priority: the worker's own queue, then a steal
    /// from the deepest peer queue past the watermark (from its tail), then
    /// the team overflow queue. `None` means back off and pull again.
    pub fn request_task(&self, id: &WorkerId) -> Option<Task> {
        let mut state = self.state.lock().unwrap();
        Self::register_locked(&mut state, &self.team, id, DEFAULT_CAPACITY_SCORE);

        // Own queue first.
        let own = state.queues.get_mut(id).unwrap().pop_front();
        if let Some(task) = own {
            let depth = state.queues[id].len();
            state.workers.get_mut(id).unwrap().queue_len = depth;
            return Some(task);
        }

        // Steal from the most loaded peer past the watermark.
        let victim = state
            .order
            .iter()
            .filter(|peer| *peer != id)
            .map(|peer| (peer.clone(), state.queues[peer].len()))
            .filter(|(_, depth)| *depth > STEAL_WATERMARK)
            .max_by_key(|(_, depth)| *depth)
            .map(|(peer, _)| peer);

        if let Some(victim) = victim {
            let stolen = state.queues.get_mut(&victim).unwrap().pop_back();
            if let Some(task) = stolen {
                let depth = state.queues[&victim].len();
                state.workers.get_mut(&victim).unwrap().queue_len = depth;
                tracing::debug!(
                    "[{}] {} stole task {}.{} from {}",
                    self.team,
                    id,
                    task.request_id,
                    task.chunk_id,
                    victim
                );
                return Some(task);
            }
        }

        // Team overflow last.
        state.overflow.pop_front()
    }

    /// Periodic health sweep. Workers silent past the staleness threshold
    /// are marked unhealthy and their queues drained onto surviving peers
    /// (or overflow). Returns the ids that flipped, mostly for tests.
    pub fn maintenance_tick(&self) -> Vec<WorkerId> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();

        debug_assert_eq!(state.registered, state.workers.len());

        let stale: Vec<WorkerId> = state
            .order
            .iter()
            .filter(|id| {
                let stats = &state.workers[*id];
                stats.healthy && now.duration_since(stats.last_heartbeat) > self.stale_after
            })
            .cloned()
            .collect();

        for id in &stale {
            tracing::warn!(
                "[{}] worker {} missed heartbeats, marking unhealthy",
                self.team,
                id
            );

            state.workers.get_mut(id).unwrap().healthy = false;

            let orphaned: Vec<Task> = state.queues.get_mut(id).unwrap().drain(..).collect();
            state.workers.get_mut(id).unwrap().queue_len = 0;

            if !orphaned.is_empty() {
                tracing::warn!(
                    "[{}] reassigning {} task(s) from {}",
                    self.team,
                    orphaned.len(),
                    id
                );
                for task in orphaned {
                    Self::place_locked(&mut state, &self.team, task);
                }
            }
        }

        for id in &state.order {
            let depth = state.queues[id].len();
            if depth > WORKER_QUEUE_WARN {
                tracing::warn!("[{}] worker {} queue depth {}", self.team, id, depth);
            }
        }
        if state.overflow.len() > OVERFLOW_QUEUE_WARN {
            tracing::warn!(
                "[{}] overflow queue depth {}",
                self.team,
                state.overflow.len()
            );
        }

        stale
    }

    // Inspection helpers, used by diagnostics and tests.

    pub fn queue_depth(&self, id: &WorkerId) -> usize {
        let state = self.state.lock().unwrap();
        state.queues.get(id).map(|q| q.len()).unwrap_or(0)
    }

    pub fn overflow_depth(&self) -> usize {
        self.state.lock().unwrap().overflow.len()
    }

    pub fn worker_stats(&self, id: &WorkerId) -> Option<WorkerStats> {
        let state = self.state.lock().unwrap();
        state.workers.get(id).cloned()
    }

    /// Total tasks currently queued anywhere in the team.
    pub fn queued_tasks(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.queues.values().map(|q| q.len()).sum::<usize>() + state.overflow.len()
    }
}
