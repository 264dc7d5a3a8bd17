use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../migrations/001_initial.sql");

/// Open the portal database and apply the schema.
///
/// WAL keeps share-link reads from blocking saves; the busy timeout is
/// generous because media blobs in the objects table make some writes slow.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        // Reads dominate (every share-link open is a load); a small pool is
        // plenty for the single-writer SQLite model.
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(SCHEMA_SQL).execute(&pool).await?;

    Ok(pool)
}
