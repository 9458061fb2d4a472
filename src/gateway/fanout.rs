use super::session::SessionStore;
use crate::scheduler::pending::ResultBoard;
use crate::scheduler::protocol::{
    HandleRequestResponse, PushChunkRequest, ENDPOINT_HANDLE_REQUEST,
};
use crate::scheduler::types::Request;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Global fan-out deadline; strictly longer than the team-leader wait so a
/// slow team times out there first.
const FANOUT_WAIT: Duration = Duration::from_secs(12);
/// Per-call timeout for the HandleRequest dispatch itself.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// One team leader the gateway can dispatch to.
#[derive(Debug, Clone)]
pub struct TeamEndpoint {
    pub node_id: String,
    pub team: String,
    pub url: String,
}

/// How a fan-out ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
    /// Every selected team accepted and delivered its full chunk count.
    Full,
    /// Something arrived, but not everything that was expected.
    Partial,
    /// Zero chunks; the session completes with no data.
    Empty,
}

#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub outcome: FanoutOutcome,
    pub expected: usize,
    pub received: usize,
}

/// Fans one request out to the selected team leaders and accounts for the
/// chunks they push back. Owns the gateway-side pending-result board.
pub struct Dispatcher {
    teams: Vec<TeamEndpoint>,
    pub board: Arc<ResultBoard>,
    teams_seen: Mutex<HashMap<String, HashSet<String>>>,
    http: reqwest::Client,
    fanout_wait: Duration,
}

impl Dispatcher {
    pub fn new(teams: Vec<TeamEndpoint>) -> Arc<Self> {
        Self::with_wait(teams, FANOUT_WAIT)
    }

    pub fn with_wait(teams: Vec<TeamEndpoint>, fanout_wait: Duration) -> Arc<Self> {
        Arc::new(Self {
            teams,
            board: Arc::new(ResultBoard::new()),
            teams_seen: Mutex::new(HashMap::new()),
            http: reqwest::Client::new(),
            fanout_wait,
        })
    }

    /// Chunk ingress from a team leader. The session buffer is the source
    /// of truth: chunks it refuses (complete or missing session, the
    /// late-push case) are dropped without touching the fan-out accounting.
    pub fn ingest(&self, push: PushChunkRequest, sessions: &SessionStore) {
        let request_id = push.result.request_id.clone();

        if !sessions.add_chunk(&request_id, push.result.clone()) {
            return;
        }

        {
            let mut seen = self.teams_seen.lock().unwrap();
            seen.entry(request_id).or_default().insert(push.team);
        }
        self.board.push(push.result);
    }

    /// Synchronous fan-out: dispatch to each selected team, then wait until
    /// the expected chunk count has arrived or the deadline fires. The
    /// request must already carry the internal (session) id.
    pub async fn run(&self, req: &Request) -> FanoutReport {
        let selected: Vec<&TeamEndpoint> = self
            .teams
            .iter()
            .filter(|t| {
                (t.team == "green" && req.need_green) || (t.team == "pink" && req.need_pink)
            })
            .collect();

        if selected.is_empty() {
            tracing::warn!("Request {} selects no team", req.request_id);
            return FanoutReport {
                outcome: FanoutOutcome::Empty,
                expected: 0,
                received: 0,
            };
        }

        let mut expected = 0usize;
        let mut accepted_teams = 0usize;
        let mut failed_teams = 0usize;

        for endpoint in &selected {
            match self.call_team(endpoint, req).await {
                Ok(resp) if resp.ok => {
                    tracing::info!(
                        "Forwarded {} to team {} ({} chunk(s) expected)",
                        req.request_id,
                        endpoint.node_id,
                        resp.expected_chunks
                    );
                    expected += resp.expected_chunks as usize;
                    accepted_teams += 1;
                }
                Ok(_) => {
                    tracing::warn!(
                        "Team {} fast-failed request {} (no healthy workers)",
                        endpoint.node_id,
                        req.request_id
                    );
                    failed_teams += 1;
                }
                Err(e) => {
                    // Counted as a non-forward; never retried within one
                    // request.
                    tracing::warn!(
                        "Failed to forward {} to team {}: {}",
                        req.request_id,
                        endpoint.node_id,
                        e
                    );
                    failed_teams += 1;
                }
            }
        }

        if failed_teams == 0 && expected == 0 {
            // Every team accepted and produced zero tasks (empty dataset):
            // nothing to wait for.
            self.finish(&req.request_id);
            return FanoutReport {
                outcome: FanoutOutcome::Empty,
                expected: 0,
                received: 0,
            };
        }

        // With a failed team nothing announces a count, so wait for at
        // least one chunk until the deadline settles it.
        let target = expected.max(1);
        let met = self
            .board
            .wait_for(&req.request_id, target, self.fanout_wait)
            .await;
        if !met {
            tracing::warn!(
                "Fan-out deadline hit for {} ({}/{} chunk(s))",
                req.request_id,
                self.board.count(&req.request_id),
                expected
            );
        }

        let received = self.board.take(&req.request_id).len();
        let teams_delivered = self.finish(&req.request_id);

        let outcome = classify(
            expected,
            received,
            accepted_teams,
            failed_teams,
            teams_delivered,
        );

        FanoutReport {
            outcome,
            expected,
            received,
        }
    }

    async fn call_team(
        &self,
        endpoint: &TeamEndpoint,
        req: &Request,
    ) -> anyhow::Result<HandleRequestResponse> {
        let url = format!("{}{}", endpoint.url, ENDPOINT_HANDLE_REQUEST);
        let resp = self
            .http
            .post(&url)
            .json(req)
            .timeout(CALL_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("team {} answered {}", endpoint.node_id, resp.status());
        }

        Ok(resp.json::<HandleRequestResponse>().await?)
    }

    /// Clears the per-request accounting; returns how many distinct teams
    /// delivered at least one chunk.
    fn finish(&self, request_id: &str) -> usize {
        let mut seen = self.teams_seen.lock().unwrap();
        seen.remove(request_id).map(|teams| teams.len()).unwrap_or(0)
    }
}

/// Pure outcome classification, shared with the tests.
pub fn classify(
    expected: usize,
    received: usize,
    accepted_teams: usize,
    failed_teams: usize,
    teams_delivered: usize,
) -> FanoutOutcome {
    if received == 0 {
        return FanoutOutcome::Empty;
    }
    if failed_teams == 0
        && expected > 0
        && received >= expected
        && teams_delivered == accepted_teams
    {
        return FanoutOutcome::Full;
    }
    FanoutOutcome::Partial
}

/// The per-session background processor: runs the fan-out under the
/// session id, then completes the session whatever the outcome. Detached
/// from the Start reply; holds no reference to the client transport.
pub async fn process_session(
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionStore>,
    session_id: String,
    client_req: Request,
) {
    let internal = Request {
        request_id: session_id.clone(),
        dataset_key: client_req.dataset_key,
        need_green: client_req.need_green,
        need_pink: client_req.need_pink,
    };

    let report = dispatcher.run(&internal).await;
    sessions.complete_session(&session_id);

    match report.outcome {
        FanoutOutcome::Full => tracing::info!(
            "Session {}: full success ({} chunk(s))",
            session_id,
            report.received
        ),
        FanoutOutcome::Partial => tracing::warn!(
            "Session {}: partial success ({}/{} chunk(s))",
            session_id,
            report.received,
            report.expected
        ),
        FanoutOutcome::Empty => tracing::warn!(
            "Session {}: no data ({} chunk(s) expected)",
            session_id,
            report.expected
        ),
    }
}
