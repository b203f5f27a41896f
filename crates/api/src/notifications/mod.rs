//! Notification routing infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus and turns match
//! and message events into durable notification rows plus live WebSocket
//! pushes for recipients who are connected.

pub mod router;

pub use router::NotificationRouter;
