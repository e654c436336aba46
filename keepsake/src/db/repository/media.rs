use std::collections::HashMap;

use chrono::Utc;
use libsql::{params, Connection};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{MediaItem, StoredMedia};

pub struct MediaRepository;

/// What a full scan needs of a memory's images.
#[derive(Debug, Default)]
pub struct MediaSummary {
    pub filenames: Vec<String>,
    pub primary: Option<MediaItem>,
}

impl MediaRepository {
    /// Positions start at 0; position 0 is the primary image.
    pub async fn insert_all(conn: &Connection, memory_id: &str, media: &[MediaItem]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        for (position, item) in media.iter().enumerate() {
            let sha256 = format!("{:x}", Sha256::digest(&item.bytes));
            conn.execute(
                r#"
                INSERT INTO memory_media (
                    memory_id, filename, position, content_type, byte_size, sha256, data, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    memory_id,
                    item.filename.clone(),
                    position as i64,
                    item.content_type.clone(),
                    item.bytes.len() as i64,
                    sha256,
                    item.bytes.clone(),
                    now.clone(),
                ],
            )
            .await?;
        }
        Ok(())
    }

    pub async fn list_for_memory(conn: &Connection, memory_id: &str) -> Result<Vec<MediaItem>> {
        let mut rows = conn
            .query(
                "SELECT filename, content_type, data FROM memory_media
                 WHERE memory_id = ?1 ORDER BY position",
                params![memory_id],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(MediaItem {
                filename: row.get(0)?,
                content_type: row.get(1)?,
                bytes: row.get(2)?,
            });
        }
        Ok(items)
    }

    /// Image names plus the primary image for several memories in one query,
    /// keyed by memory id. Payloads of the other images are not read.
    pub async fn summaries_for_memories(
        conn: &Connection,
        memory_ids: &[String],
    ) -> Result<HashMap<String, MediaSummary>> {
        let mut grouped: HashMap<String, MediaSummary> = HashMap::new();
        if memory_ids.is_empty() {
            return Ok(grouped);
        }

        let placeholders = (1..=memory_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT memory_id, filename, content_type, \
                    CASE WHEN position = 0 THEN data END \
             FROM memory_media \
             WHERE memory_id IN ({placeholders}) ORDER BY memory_id, position"
        );
        let params: Vec<libsql::Value> = memory_ids
            .iter()
            .map(|id| libsql::Value::from(id.clone()))
            .collect();

        let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        while let Some(row) = rows.next().await? {
            let memory_id: String = row.get(0)?;
            let filename: String = row.get(1)?;
            let summary = grouped.entry(memory_id).or_default();
            if let Some(bytes) = row.get::<Option<Vec<u8>>>(3)? {
                summary.primary = Some(MediaItem {
                    filename: filename.clone(),
                    content_type: row.get(2)?,
                    bytes,
                });
            }
            summary.filenames.push(filename);
        }
        Ok(grouped)
    }

    pub async fn get(
        conn: &Connection,
        memory_id: &str,
        filename: &str,
    ) -> Result<Option<StoredMedia>> {
        let mut rows = conn
            .query(
                "SELECT memory_id, filename, content_type, sha256, data FROM memory_media
                 WHERE memory_id = ?1 AND filename = ?2",
                params![memory_id, filename],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(StoredMedia {
                memory_id: row.get(0)?,
                filename: row.get(1)?,
                content_type: row.get(2)?,
                sha256: row.get(3)?,
                bytes: row.get(4)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_for_memory(conn: &Connection, memory_id: &str) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM memory_media WHERE memory_id = ?1",
                params![memory_id],
            )
            .await?;
        Ok(affected)
    }
}
