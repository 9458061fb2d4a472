use crate::scheduler::types::ChunkResult;

use dashmap::DashMap;
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Blocking-read deadline. Strictly longer than the team-leader and
/// fan-out deadlines so clients never observe a transport timeout before
/// the scheduler's own timeouts have had their say.
const GET_NEXT_WAIT: Duration = Duration::from_secs(185);
/// Idle sessions older than this are evicted, complete or not.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// Cleaner cadence.
const CLEANER_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of a blocking indexed read.
#[derive(Debug, Clone, PartialEq)]
pub enum GetNextResult {
    /// The chunk at the requested index.
    Chunk { payload: Vec<u8>, has_more: bool },
    /// Session is complete and the index is past the end.
    End,
    /// No such session.
    NotFound,
    /// The deadline fired while the session was still open.
    TimedOut,
}

/// Outcome of a non-blocking cursored read.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub ready: bool,
    pub payload: Vec<u8>,
    pub has_more: bool,
}

struct SessionState {
    chunks: Vec<ChunkResult>,
    complete: bool,
    next_poll_index: usize,
    last_access: Instant,
}

/// One in-flight client request: an append-only chunk buffer plus the
/// notifier blocking readers wait on. The per-session mutex covers all
/// state; the store-level map is lock-free.
struct Session {
    state: Mutex<SessionState>,
    arrived: Notify,
}

impl Session {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SessionState {
                chunks: Vec::new(),
                complete: false,
                next_poll_index: 0,
                last_access: Instant::now(),
            }),
            arrived: Notify::new(),
        })
    }
}

/// The gateway's session table.
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    get_next_wait: Duration,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Self::with_timings(GET_NEXT_WAIT, IDLE_TIMEOUT)
    }

    /// Constructor with custom deadlines; tests shrink them.
    pub fn with_timings(get_next_wait: Duration, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            get_next_wait,
            idle_timeout,
        })
    }

    /// Opens a session under a fresh id (timestamp plus random suffix; the
    /// id doubles as the internal request id downstream).
    pub fn create_session(&self) -> String {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        let session_id = format!("session-{}-{}", now_ms, suffix);

        self.sessions.insert(session_id.clone(), Session::new());
        tracing::info!("Created session {}", session_id);

        session_id
    }

    /// Appends a chunk in arrival order and wakes blocked readers.
    /// Returns false when the chunk was silently discarded (unknown or
    /// already-complete session, the late-push case).
    pub fn add_chunk(&self, session_id: &str, chunk: ChunkResult) -> bool {
        let Some(session) = self.get(session_id) else {
            tracing::debug!("Discarding chunk for unknown session {}", session_id);
            return false;
        };

        {
            let mut state = session.state.lock().unwrap();
            if state.complete {
                tracing::debug!("Discarding late chunk for complete session {}", session_id);
                return false;
            }
            state.chunks.push(chunk);
            tracing::debug!(
                "Session {} buffered chunk {} (total {})",
                session_id,
                state.chunks.len() - 1,
                state.chunks.len()
            );
        }

        session.arrived.notify_waiters();
        true
    }

    /// Marks the session complete; no chunk will be appended afterwards.
    pub fn complete_session(&self, session_id: &str) {
        let Some(session) = self.get(session_id) else {
            tracing::debug!("Completing unknown session {}", session_id);
            return;
        };

        {
            let mut state = session.state.lock().unwrap();
            state.complete = true;
            tracing::info!(
                "Session {} complete ({} chunk(s))",
                session_id,
                state.chunks.len()
            );
        }

        session.arrived.notify_waiters();
    }

    /// Blocking indexed read: waits until the chunk at `index` exists, the
    /// session completes, or the deadline passes. Re-reads of the same
    /// index are idempotent.
    pub async fn get_next(&self, session_id: &str, index: usize) -> GetNextResult {
        let Some(session) = self.get(session_id) else {
            tracing::warn!("GetNext on unknown session {}", session_id);
            return GetNextResult::NotFound;
        };

        let deadline = tokio::time::Instant::now() + self.get_next_wait;

        loop {
            let notified = session.arrived.notified();

            {
                let mut state = session.state.lock().unwrap();
                state.last_access = Instant::now();

                if index < state.chunks.len() {
                    let has_more = index + 1 < state.chunks.len() || !state.complete;
                    return GetNextResult::Chunk {
                        payload: state.chunks[index].payload.clone(),
                        has_more,
                    };
                }
                if state.complete {
                    return GetNextResult::End;
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!(
                    "GetNext timeout on session {} index {}",
                    session_id,
                    index
                );
                return GetNextResult::TimedOut;
            }

            let _ = tokio::time::timeout(deadline - now, notified).await;
        }
    }

    /// Non-blocking cursored read; advances the cursor by exactly one on
    /// each ready result. Must not be mixed with `get_next` on one session.
    pub fn poll_next(&self, session_id: &str) -> Option<PollOutcome> {
        let session = self.get(session_id).or_else(|| {
            tracing::warn!("PollNext on unknown session {}", session_id);
            None
        })?;

        let mut state = session.state.lock().unwrap();
        state.last_access = Instant::now();

        if state.next_poll_index < state.chunks.len() {
            let payload = state.chunks[state.next_poll_index].payload.clone();
            state.next_poll_index += 1;
            let has_more = state.next_poll_index < state.chunks.len() || !state.complete;
            return Some(PollOutcome {
                ready: true,
                payload,
                has_more,
            });
        }

        Some(PollOutcome {
            ready: false,
            payload: Vec::new(),
            has_more: !state.complete,
        })
    }

    /// Erases the session. In-flight background work is left to finish and
    /// discard its results against the missing entry.
    pub fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::info!("Closed session {}", session_id);
        } else {
            tracing::debug!("Close on unknown session {}", session_id);
        }
        removed
    }

    /// One cleaner pass: evicts sessions idle past the timeout, complete or
    /// not. Returns how many went away.
    pub fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                let state = entry.value().state.lock().unwrap();
                now.duration_since(state.last_access) > self.idle_timeout
            })
            .map(|entry| entry.key().clone())
            .collect();

        for session_id in &stale {
            self.sessions.remove(session_id);
            tracing::info!("Evicted idle session {}", session_id);
        }

        stale.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Buffered chunk count, mostly for tests and diagnostics.
    pub fn chunk_count(&self, session_id: &str) -> Option<usize> {
        let session = self.get(session_id)?;
        let state = session.state.lock().unwrap();
        Some(state.chunks.len())
    }

    fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }
}

/// Background cleaner: one sweep per minute until the process exits.
pub async fn run_cleaner(store: Arc<SessionStore>) {
    let mut interval = tokio::time::interval(CLEANER_INTERVAL);
    interval.tick().await;

    loop {
        interval.tick().await;
        let evicted = store.sweep_idle();
        if evicted > 0 {
            tracing::info!("Session cleaner evicted {} session(s)", evicted);
        }
    }
}
