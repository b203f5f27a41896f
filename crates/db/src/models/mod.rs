//! Row models and DTOs.
//!
//! One module per table. Row structs derive `sqlx::FromRow`; status and
//! kind columns are plain strings validated against the constants in
//! `rishta_core`.

pub mod connection;
pub mod like;
pub mod message;
pub mod notification;
pub mod quota;
pub mod user;
