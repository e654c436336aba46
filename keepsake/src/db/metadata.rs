use crate::error::Result;
use chrono::Utc;
use libsql::Connection;

const MEMORY_SEQ_KEY: &str = "memory_seq";

pub struct MetadataRepository;

impl MetadataRepository {
    pub async fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query("SELECT value FROM keepsake_meta WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get::<String>(0)?))
        } else {
            Ok(None)
        }
    }

    pub async fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO keepsake_meta (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value, &now],
        )
        .await?;
        Ok(())
    }

    /// Last sequence number handed out, zero for a fresh store.
    pub async fn current_sequence(conn: &Connection) -> Result<i64> {
        match Self::get(conn, MEMORY_SEQ_KEY).await? {
            Some(s) => Ok(s.parse().unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Reserve the next memory sequence number.
    ///
    /// Must run inside the creating transaction. Numbers of deleted memories
    /// are never handed out again.
    pub async fn next_sequence(conn: &Connection) -> Result<i64> {
        let current = Self::current_sequence(conn).await?;

        let mut rows = conn
            .query("SELECT COALESCE(MAX(seq), 0) FROM memories", ())
            .await?;
        let max_seq = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        let next = current.max(max_seq) + 1;
        Self::set(conn, MEMORY_SEQ_KEY, &next.to_string()).await?;
        Ok(next)
    }
}
