/// PostgreSQL access
///
/// - [`pool`]: connection pool creation and health checks
/// - [`migrations`]: embedded schema migrations
/// - [`maintenance`]: periodic purge of expired auth rows
///
/// Row types and queries live in [`crate::models`].

pub mod maintenance;
pub mod migrations;
pub mod pool;
