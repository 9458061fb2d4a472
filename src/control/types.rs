/// Coarse node state reported by Status, derived from pending-result depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Busy,
    Overloaded,
    ShuttingDown,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Idle => "IDLE",
            NodeState::Busy => "BUSY",
            NodeState::Overloaded => "OVERLOADED",
            NodeState::ShuttingDown => "SHUTTING_DOWN",
        }
    }

    /// Thresholds: no pending results is IDLE, fewer than five is BUSY,
    /// five or more is OVERLOADED.
    pub fn from_pending(pending: usize) -> Self {
        match pending {
            0 => NodeState::Idle,
            1..=4 => NodeState::Busy,
            _ => NodeState::Overloaded,
        }
    }
}

/// Where a node's pending-result depth comes from. The gateway and team
/// leaders point this at their result board; workers have nothing pending.
pub trait PendingSource: Send + Sync {
    fn pending(&self) -> usize;
}

/// Pending source for roles that never hold results.
pub struct NoPending;

impl PendingSource for NoPending {
    fn pending(&self) -> usize {
        0
    }
}
