//! Distributed Query-Processing Fabric Library
//!
//! This library crate defines the core modules of the six-node fabric.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The fabric is composed of loosely coupled subsystems:
//!
//! - **`config`**: The topology layer. Loads the fixed six-node graph
//!   (gateway, two team leaders, three workers) from a JSON document.
//! - **`control`**: The management surface every node exposes: heartbeat
//!   ping, status reporting (IDLE/BUSY/OVERLOADED/SHUTTING_DOWN) and
//!   graceful shutdown.
//! - **`dataset`**: Glue around the CSV row store requests are served from;
//!   coalesces concurrent loads of the same dataset.
//! - **`scheduler`**: The core. A team leader's capacity-aware,
//!   work-stealing task scheduler with heartbeat-driven health tracking,
//!   reassignment on worker death and partial-failure tolerance.
//! - **`gateway`**: The session layer. Decouples the synchronous client
//!   pull (indexed get and poll) from asynchronous chunk arrivals, and
//!   fans requests out across the teams.
//! - **`worker`**: The pull loop and heartbeat loop a worker runs against
//!   its team leader.

pub mod config;
pub mod control;
pub mod dataset;
pub mod gateway;
pub mod scheduler;
pub mod worker;
