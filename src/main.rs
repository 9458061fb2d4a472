use axum::routing::{get, post};
use axum::{Extension, Router};
use query_fabric::config::loader::{load_config, DEFAULT_CONFIG_PATH};
use query_fabric::config::types::{NetworkConfig, NodeInfo, NodeRole};
use query_fabric::control::handlers as control_handlers;
use query_fabric::control::protocol::{ENDPOINT_PING, ENDPOINT_SHUTDOWN, ENDPOINT_STATUS};
use query_fabric::control::types::NoPending;
use query_fabric::control::vitals::{run_status_log, NodeVitals};
use query_fabric::gateway::fanout::{Dispatcher, TeamEndpoint};
use query_fabric::gateway::handlers as gateway_handlers;
use query_fabric::gateway::protocol::{
    ENDPOINT_CLOSE, ENDPOINT_GET_NEXT, ENDPOINT_POLL_NEXT, ENDPOINT_START,
};
use query_fabric::gateway::session::{run_cleaner, SessionStore};
use query_fabric::scheduler::handlers as team_handlers;
use query_fabric::scheduler::leader::TeamLeader;
use query_fabric::scheduler::protocol::{
    ENDPOINT_HANDLE_REQUEST, ENDPOINT_PUSH_RESULT, ENDPOINT_REQUEST_TASK,
};
use query_fabric::scheduler::scheduler::MAINTENANCE_INTERVAL;
use query_fabric::scheduler::types::WorkerId;
use query_fabric::worker::runner::WorkerRuntime;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut node_id: Option<String> = None;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--node" => {
                node_id = args.get(i + 1).cloned();
                i += 2;
            }
            "--config" => {
                if let Some(path) = args.get(i + 1) {
                    config_path = path.clone();
                }
                i += 2;
            }
            other if !other.starts_with('-') && node_id.is_none() => {
                node_id = Some(other.to_string());
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(node_id) = node_id else {
        eprintln!("Usage: {} <node-id> [--config <path>]", args[0]);
        eprintln!("       {} --node <node-id> [--config <path>]", args[0]);
        std::process::exit(1);
    };

    let cfg = match load_config(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Config load failed: {:#}", e);
            std::process::exit(1);
        }
    };

    let Some(me) = cfg.node(&node_id).cloned() else {
        tracing::error!("Unknown node {:?} in {}", node_id, config_path);
        std::process::exit(1);
    };

    tracing::info!(
        "Starting node {} ({:?}, team {}) on {}:{}",
        me.id,
        me.role,
        me.team,
        me.host,
        me.port
    );

    let (app, vitals) = match me.role {
        NodeRole::Leader => build_gateway(&cfg, &me),
        NodeRole::TeamLeader => build_team_leader(&cfg, &me),
        NodeRole::Worker => build_worker(&cfg, &me)?,
    };

    tokio::spawn(run_status_log(vitals.clone()));

    let bind_addr: SocketAddr = format!("0.0.0.0:{}", me.port).parse()?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Node {} listening on {}", me.id, bind_addr);

    let shutdown = vitals.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.exit_requested().await;
        })
        .await?;

    tracing::info!("Node {} stopped", me.id);
    Ok(())
}

/// Gateway: the client surface, the session layer and the fan-out path,
/// plus the chunk ingress team leaders push into.
fn build_gateway(cfg: &NetworkConfig, me: &NodeInfo) -> (Router, Arc<NodeVitals>) {
    let sessions = SessionStore::new();

    let teams: Vec<TeamEndpoint> = cfg
        .team_leaders()
        .iter()
        .map(|tl| TeamEndpoint {
            node_id: tl.id.clone(),
            team: tl.team.clone(),
            url: tl.base_url(),
        })
        .collect();
    tracing::info!(
        "Gateway {} fans out to {} team leader(s)",
        me.id,
        teams.len()
    );

    let dispatcher = Dispatcher::new(teams);
    let vitals = NodeVitals::new(&me.id, dispatcher.board.clone());

    tokio::spawn(run_cleaner(sessions.clone()));

    let app = Router::new()
        .route(ENDPOINT_START, post(gateway_handlers::handle_start))
        .route(ENDPOINT_GET_NEXT, post(gateway_handlers::handle_get_next))
        .route(ENDPOINT_POLL_NEXT, post(gateway_handlers::handle_poll_next))
        .route(ENDPOINT_CLOSE, post(gateway_handlers::handle_close))
        .route(ENDPOINT_PUSH_RESULT, post(gateway_handlers::handle_push_chunk))
        .route(ENDPOINT_PING, post(control_handlers::handle_ping))
        .route(ENDPOINT_STATUS, get(control_handlers::handle_status))
        .route(ENDPOINT_SHUTDOWN, post(control_handlers::handle_shutdown))
        .layer(Extension(sessions))
        .layer(Extension(dispatcher))
        .layer(Extension(vitals.clone()));

    (app, vitals)
}

/// Team leader: the team ingress surface, the scheduler maintenance loop
/// and the worker registry seeded from the topology document.
fn build_team_leader(cfg: &NetworkConfig, me: &NodeInfo) -> (Router, Arc<NodeVitals>) {
    let gateway_url = cfg.gateway().map(|g| g.base_url());
    let leader = TeamLeader::new(&me.id, &me.team, gateway_url);

    for worker in cfg.workers_in_team(&me.team) {
        leader
            .scheduler
            .register_worker(&WorkerId::new(&worker.id), worker.capacity_score);
    }

    let vitals = NodeVitals::new(&me.id, leader.results.clone());

    {
        let leader = leader.clone();
        let vitals = vitals.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                interval.tick().await;
                if vitals.is_shutting_down() {
                    break;
                }
                leader.scheduler.maintenance_tick();
            }
        });
    }

    let app = Router::new()
        .route(ENDPOINT_HANDLE_REQUEST, post(team_handlers::handle_team_request))
        .route(ENDPOINT_PUSH_RESULT, post(team_handlers::handle_push_result))
        .route(ENDPOINT_REQUEST_TASK, post(team_handlers::handle_request_task))
        .route(ENDPOINT_PING, post(team_handlers::handle_worker_ping))
        .route(ENDPOINT_STATUS, get(control_handlers::handle_status))
        .route(ENDPOINT_SHUTDOWN, post(control_handlers::handle_shutdown))
        .layer(Extension(leader))
        .layer(Extension(vitals.clone()));

    (app, vitals)
}

/// Worker: the pull and heartbeat loops against the owning team leader,
/// plus the plain control surface.
fn build_worker(cfg: &NetworkConfig, me: &NodeInfo) -> anyhow::Result<(Router, Arc<NodeVitals>)> {
    let Some(leader_info) = cfg.leader_of_team(&me.team) else {
        anyhow::bail!("no team leader configured for team {:?}", me.team);
    };

    let vitals = NodeVitals::new(&me.id, Arc::new(NoPending));
    let worker = WorkerRuntime::new(
        &me.id,
        &me.team,
        me.capacity_score,
        leader_info.base_url(),
        vitals.clone(),
    );
    tracing::info!(
        "Worker {} pulls from team leader {} ({})",
        me.id,
        leader_info.id,
        leader_info.base_url()
    );

    tokio::spawn(worker.clone().run_pull_loop());
    tokio::spawn(worker.clone().run_heartbeat_loop());

    let app = Router::new()
        .route(ENDPOINT_PING, post(control_handlers::handle_ping))
        .route(ENDPOINT_STATUS, get(control_handlers::handle_status))
        .route(ENDPOINT_SHUTDOWN, post(control_handlers::handle_shutdown))
        .layer(Extension(vitals.clone()));

    Ok((app, vitals))
}
