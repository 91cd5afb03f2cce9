/// Database layer for Tallybook
///
/// Connection pooling and migrations. Row access goes through the
/// [`crate::store`] abstraction, not through this module.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: sqlx migration runner over `migrations/`

pub mod migrations;
pub mod pool;
