//! Node Control Module
//!
//! The control surface every process exposes regardless of role: heartbeat
//! ping, status reporting and remote shutdown. Team leaders override the
//! ping route with their own handler (heartbeats carry scheduler metrics);
//! gateway and workers answer with a plain acknowledgement.
//!
//! ## Submodules
//! - **`types`**: node states and the pending-depth seam.
//! - **`vitals`**: per-process counters (uptime, requests, shutdown flag).
//! - **`protocol`**: HTTP contracts for the control surface.
//! - **`handlers`**: axum handlers for ping, status and shutdown.

pub mod handlers;
pub mod protocol;
pub mod types;
pub mod vitals;

#[cfg(test)]
mod tests;
