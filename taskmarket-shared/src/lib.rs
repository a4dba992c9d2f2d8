//! # TaskMarket Shared Library
//!
//! Domain types, persistence and orchestration used by the TaskMarket API.
//!
//! ## Module Organization
//!
//! - `models`: database rows and queries
//! - `db`: connection pool and migrations
//! - `auth`: passwords, JWTs, handles, OTP codes, request auth context
//! - `services`: registration and authentication orchestrators and the
//!   collaborator traits they depend on
//! - `infra`: PostgreSQL, JWT, OTP and local-disk implementations of those
//!   traits
//! - `memory`: in-memory implementations for tests (`test-support` feature)

pub mod auth;
pub mod db;
pub mod infra;
pub mod models;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

/// Current version of the TaskMarket shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
