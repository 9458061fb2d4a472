use serde::{Deserialize, Serialize};

/// Role a process plays in the fabric. Exactly one LEADER (the client
/// gateway), two TEAM_LEADERs and three WORKERs make up the fixed topology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeRole {
    #[serde(rename = "LEADER")]
    Leader,
    #[serde(rename = "TEAM_LEADER")]
    TeamLeader,
    #[serde(rename = "WORKER")]
    Worker,
}

/// One process in the topology document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub role: NodeRole,
    pub host: String,
    pub port: u16,
    pub team: String,
    /// Relative throughput hint for the scheduler; defaults to 1 when absent.
    #[serde(default = "default_capacity")]
    pub capacity_score: u32,
}

fn default_capacity() -> u32 {
    1
}

impl NodeInfo {
    /// Base URL for HTTP calls to this node.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Named shared-memory segment description. Parsed and kept so the external
/// inspector tool and the fabric read one document; the fabric itself never
/// touches these segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedSegment {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedMemory {
    #[serde(default)]
    pub segments: Vec<SharedSegment>,
}

/// The whole topology document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub nodes: Vec<NodeInfo>,
    /// Informational edge list; routing decisions never consult it.
    #[serde(default)]
    pub overlay: Vec<(String, String)>,
    pub client_gateway: String,
    #[serde(default)]
    pub shared_memory: SharedMemory,
}

impl NetworkConfig {
    pub fn node(&self, id: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The gateway node named by `client_gateway`.
    pub fn gateway(&self) -> Option<&NodeInfo> {
        self.node(&self.client_gateway)
    }

    /// All team leaders, in document order.
    pub fn team_leaders(&self) -> Vec<&NodeInfo> {
        self.nodes
            .iter()
            .filter(|n| n.role == NodeRole::TeamLeader)
            .collect()
    }

    /// Workers belonging to `team`, in document order. Document order is
    /// what the scheduler uses for placement tie-breaking, so it is stable.
    pub fn workers_in_team(&self, team: &str) -> Vec<&NodeInfo> {
        self.nodes
            .iter()
            .filter(|n| n.role == NodeRole::Worker && n.team == team)
            .collect()
    }

    /// The team leader owning `team`, if any.
    pub fn leader_of_team(&self, team: &str) -> Option<&NodeInfo> {
        self.nodes
            .iter()
            .find(|n| n.role == NodeRole::TeamLeader && n.team == team)
    }
}
