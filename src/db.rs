//! Database connection pool and migrations.
//!
//! The pool is shared by every Postgres repository; migrations under
//! `migrations/` create the catalog, key, run and activity tables.

use std::time::Duration;

use sqlx::{Pool, Postgres};

/// PostgreSQL connection pool shared by the repositories.
pub type DbPool = Pool<Postgres>;

/// Create the connection pool.
///
/// Sweeps check brands one at a time and manual checks are short, so a
/// handful of connections is enough.
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached within the acquire timeout.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/`.
///
/// Applied migrations are tracked in `_sqlx_migrations`, so this is safe to
/// call on every start.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
