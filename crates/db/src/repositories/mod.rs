//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or `&mut PgConnection` for operations that must run
//! inside a caller's transaction) as the first argument.

pub mod connection_repo;
pub mod like_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod quota_repo;
pub mod user_repo;

pub use connection_repo::ConnectionRepo;
pub use like_repo::LikeRepo;
pub use message_repo::{AppendError, MessageRepo};
pub use notification_repo::NotificationRepo;
pub use quota_repo::QuotaRepo;
pub use user_repo::UserRepo;
