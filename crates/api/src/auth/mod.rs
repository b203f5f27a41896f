//! Authentication primitives.
//!
//! - [`jwt`] -- access-token validation for the externally issued identity
//!   tokens this service trusts.

pub mod jwt;
