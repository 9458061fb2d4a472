//! Topology Configuration Module
//!
//! Loads the fixed six-node fabric topology from a JSON document. The document
//! names every process (id, role, host, port, team, capacity score), the
//! informational overlay edges, the client gateway node, and the shared-memory
//! segments consumed by the external inspector tool.
//!
//! The topology is fixed at boot: there is no discovery protocol. Every process
//! reads the same document and finds its peers by role and team.

pub mod loader;
pub mod types;

#[cfg(test)]
mod tests;
