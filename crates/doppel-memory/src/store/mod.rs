//! SQLite-backed persistent memory store.
//!
//! Split into focused submodules:
//! - `person`: person profiles, style learning, emotion history
//! - `turns`: conversation log, retention pruning, digest stats
//! - `recap`: compressed recaps of long histories
//! - `safety`: stored safety rules
//! - `todos`: per-contact todo lists
//! - `reminders`: reminder CRUD and due-reminder polling

mod person;
mod recap;
mod reminders;
mod safety;
mod todos;
mod turns;

pub use person::{PersonPatch, PersonProfile};
pub use reminders::Reminder;
pub use safety::SafetyRule;
pub use todos::TodoItem;
pub use turns::{MemoryStats, Turn};

use doppel_core::{config::MemoryConfig, config::shellexpand, error::DoppelError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Current wall time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Persistent memory store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    max_context_messages: usize,
    recap_threshold: usize,
    recap_keep_recent: usize,
    /// Recaps keyed by `(sender, history_length)`.
    recaps: Arc<Mutex<HashMap<(String, usize), String>>>,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, DoppelError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DoppelError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| DoppelError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| DoppelError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Memory store initialized at {db_path}");

        Ok(Self::from_pool(pool, config))
    }

    /// Open a throwaway in-memory store (one-shot CLI runs and tests).
    pub async fn in_memory(config: &MemoryConfig) -> Result<Self, DoppelError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DoppelError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true);

        // A single pinned connection: every new in-memory connection is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| DoppelError::Memory(format!("failed to open in-memory sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        Ok(Self::from_pool(pool, config))
    }

    fn from_pool(pool: SqlitePool, config: &MemoryConfig) -> Self {
        Self {
            pool,
            max_context_messages: config.max_context_messages,
            recap_threshold: config.recap_threshold,
            recap_keep_recent: config.recap_keep_recent,
            recaps: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Default number of recent turns loaded into a context.
    pub fn max_context_messages(&self) -> usize {
        self.max_context_messages
    }

    /// Get the database file size in bytes.
    pub async fn db_size(&self) -> Result<u64, DoppelError> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("pragma failed: {e}")))?;

        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("pragma failed: {e}")))?;

        Ok((page_count * page_size) as u64)
    }

    /// Flush the write-ahead log into the main database file.
    pub async fn checkpoint(&self) -> Result<(), DoppelError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("checkpoint failed: {e}")))?;
        Ok(())
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DoppelError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            ("002_tools", include_str!("../../migrations/002_tools.sql")),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        DoppelError::Memory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| DoppelError::Memory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    DoppelError::Memory(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
