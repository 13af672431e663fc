//! SQLite pool setup and schema migrations for both services.

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};

/// Which service's schema to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Identity,
    Inventory,
}

impl Schema {
    fn script(self) -> &'static str {
        match self {
            Schema::Identity => include_str!("../migrations/identity/0001_init.sql"),
            Schema::Inventory => include_str!("../migrations/inventory/0001_init.sql"),
        }
    }
}

/// Open a SQLite pool for `database_url`.
///
/// The database file (and its parent directory) are created when missing.
/// WAL journaling plus a busy timeout let concurrent writers queue on the
/// database lock instead of failing immediately.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    tracing::debug!("Connecting to SQLite at {:?}", options.get_filename());

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Apply the embedded schema script for `schema`, one statement at a time.
/// Every statement is idempotent, so this is safe to run on each start.
pub async fn run_migrations(db: &SqlitePool, schema: Schema) -> Result<(), sqlx::Error> {
    let statements = schema
        .script()
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!(
        "Running {} migration statements for {:?}...",
        statements.len(),
        schema
    );

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Column named by a SQLite unique-constraint failure, if `err` is one.
///
/// SQLite reports these as `UNIQUE constraint failed: <table>.<column>`.
pub(crate) fn unique_violation_column(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.message().to_ascii_lowercase().contains("unique") =>
        {
            let target = db_err.message().rsplit(':').next()?.trim();
            Some(target.split_once('.').map_or(target, |(_, column)| column))
        }
        _ => None,
    }
}

/// A throwaway database file with `schema` applied. The directory is removed
/// when the returned guard drops.
#[cfg(test)]
pub(crate) async fn scratch_pool(schema: Schema) -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = connect(&url, 5).await.expect("scratch pool should open");
    run_migrations(&pool, schema)
        .await
        .expect("migrations should apply");
    (dir, pool)
}
