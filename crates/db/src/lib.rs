use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

mod games;
mod stadiums;
mod tickets;
mod users;

pub use games::*;
pub use stadiums::*;
pub use tickets::*;
pub use users::*;

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    info!("Connected to database: {database_url}");
    Ok(pool)
}

/// A pool that opens connections on first use. Boot succeeds even when the
/// database is unreachable; every query fails until it comes back.
pub fn connect_lazy(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    Ok(SqlitePoolOptions::new().connect_lazy_with(options))
}

/// Private in-memory database with migrations applied. A single connection
/// that never expires, since every new connection would see an empty database.
pub async fn memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}

/// True when `err` comes from a UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation())
}

async fn count(pool: &SqlitePool, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let total: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(total)
}
