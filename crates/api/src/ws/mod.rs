//! WebSocket infrastructure for live conversations.
//!
//! Provides presence/room management with fan-out, the typed client/server
//! frame protocol, heartbeat monitoring, and the HTTP upgrade handler used
//! by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::PresenceManager;
pub use protocol::{ClientFrame, ServerFrame};
