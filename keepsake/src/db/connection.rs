use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageMode {
    File,
    Memory,
    Remote,
}

pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    /// In-memory databases are private to a connection, so one is shared.
    shared: Option<Connection>,
    pub(crate) mode: StorageMode,
    pub(crate) busy_timeout_ms: u64,
    pub(crate) journal_mode: String,
    pub(crate) synchronous: String,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let busy_timeout_ms = config.busy_timeout_ms;
        let journal_mode = normalize_journal_mode(&config.journal_mode).to_string();
        let synchronous = normalize_synchronous(&config.synchronous).to_string();

        let (db, mode) =
            if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
                let db = if let Some(ref local_path) = config.local_path {
                    Builder::new_remote_replica(
                        local_path,
                        config.url.clone(),
                        config.auth_token.clone().unwrap_or_default(),
                    )
                    .build()
                    .await?
                } else {
                    Builder::new_remote(
                        config.url.clone(),
                        config.auth_token.clone().unwrap_or_default(),
                    )
                    .build()
                    .await?
                };
                (db, StorageMode::Remote)
            } else if config.url == ":memory:" {
                (
                    Builder::new_local(":memory:").build().await?,
                    StorageMode::Memory,
                )
            } else {
                let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
                (Builder::new_local(path).build().await?, StorageMode::File)
            };

        let shared = match mode {
            StorageMode::Memory => Some(db.connect()?),
            _ => None,
        };

        let database = Self {
            db: Arc::new(db),
            shared,
            mode,
            busy_timeout_ms,
            journal_mode,
            synchronous,
        };
        database.configure_database().await?;
        database.init_schema().await?;

        tracing::info!(url = %config.url, mode = ?mode, "Database ready");
        Ok(database)
    }

    /// Open a connection with per-connection pragmas applied.
    pub async fn connect(&self) -> Result<Connection> {
        if let Some(conn) = &self.shared {
            return Ok(conn.clone());
        }

        let conn = self.db.connect()?;
        if self.mode != StorageMode::Remote {
            self.apply_connection_pragmas(&conn).await;
        }
        Ok(conn)
    }

    pub(crate) fn is_shared_connection(&self) -> bool {
        self.shared.is_some()
    }

    async fn apply_connection_pragmas(&self, conn: &Connection) {
        let busy_timeout_sql = format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms);
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                error = %error,
                "Failed to set SQLite busy_timeout"
            );
        }

        let synchronous_sql = format!("PRAGMA synchronous = {}", self.synchronous);
        if let Err(error) = conn.execute_batch(&synchronous_sql).await {
            tracing::warn!(
                mode = %self.synchronous,
                error = %error,
                "Failed to set SQLite synchronous pragma"
            );
        }

        if let Err(error) = conn.execute_batch("PRAGMA foreign_keys = ON").await {
            tracing::warn!(error = %error, "Failed to enable SQLite foreign keys");
        }
    }

    async fn configure_database(&self) -> Result<()> {
        if self.mode != StorageMode::File {
            if let Some(conn) = &self.shared {
                self.apply_connection_pragmas(conn).await;
            }
            return Ok(());
        }

        let conn = self.connect().await?;
        let journal_sql = format!("PRAGMA journal_mode = {}", self.journal_mode);
        if let Err(error) = conn.execute_batch(&journal_sql).await {
            tracing::warn!(
                mode = %self.journal_mode,
                error = %error,
                "Failed to set SQLite journal_mode"
            );
        }

        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect().await?;
        schema::init_schema(&conn).await?;
        Ok(())
    }

    pub async fn sync(&self) -> Result<()> {
        if self.mode != StorageMode::Remote {
            return Ok(());
        }
        let replicated = self.db.sync().await?;
        tracing::debug!("Database synced: {:?}", replicated);
        Ok(())
    }

    /// Checkpoint the write-ahead log so the main file holds every committed write.
    pub async fn flush(&self) -> Result<()> {
        if self.mode != StorageMode::File || self.journal_mode != "WAL" {
            return Ok(());
        }
        let conn = self.connect().await?;
        let mut rows = conn.query("PRAGMA wal_checkpoint(TRUNCATE)", ()).await?;
        while rows.next().await?.is_some() {}
        tracing::debug!("WAL checkpoint complete");
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            shared: self.shared.clone(),
            mode: self.mode,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode.clone(),
            synchronous: self.synchronous.clone(),
        }
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "WAL" => "WAL",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "NORMAL" => "NORMAL",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}
