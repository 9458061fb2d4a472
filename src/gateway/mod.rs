//! Client Gateway Module
//!
//! The fabric's front door. Terminates client calls, owns the session layer
//! that buffers chunks for indexed (`GetNext`) and cursored (`PollNext`)
//! retrieval, and fans each request out to the selected team leaders.
//!
//! ## Core Mechanisms
//! - **Sessions**: every `Start` opens a fresh session keyed by a generated
//!   id, decoupling the synchronous client pull from asynchronous chunk
//!   arrivals. Chunks buffer in arrival order; blocking reads wait on the
//!   session notifier. An idle cleaner evicts abandoned sessions.
//! - **Fan-out**: one call per selected team leader, then a bounded wait on
//!   the pending-result board until the expected chunk count arrives.
//!   Missing chunks degrade the request to partial success, never an error.
//! - **Internal request ids**: downstream work runs under the session id,
//!   so two clients reusing an external request id never collide.
//!
//! ## Submodules
//! - **`session`**: the session store and its wait/cursor semantics.
//! - **`fanout`**: team selection, dispatch, arrival accounting.
//! - **`protocol`**: HTTP contracts for the client surface.
//! - **`handlers`**: axum handlers for the client and ingress routes.

pub mod fanout;
pub mod handlers;
pub mod protocol;
pub mod session;

#[cfg(test)]
mod tests;
