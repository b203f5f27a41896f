//! Rishta event bus: the fire-and-forget notification hook.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] -- the canonical event envelope published on a new
//!   mutual match or message.
//!
//! Publishing never fails and never blocks the write that triggered it;
//! consumers (the notification router) subscribe independently.

pub mod bus;

pub use bus::{DomainEvent, EventBus, EVENT_MATCH_CREATED, EVENT_MESSAGE_CREATED};
