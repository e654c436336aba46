use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{KeepsakeError, Result};
use crate::models::{
    format_timestamp, parse_timestamp, Coordinates, Location, Memory, MemorySummary,
};

use super::MediaRepository;

const MEMORY_COLUMNS: &str = "id, seq, title, description, timestamp, location_name, latitude, \
                              longitude, tags, people, created_at, updated_at";

pub struct MemoryRepository;

/// One keyset page of a full scan.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub memories: Vec<MemorySummary>,
    /// Rows read, including skipped ones.
    pub scanned: u32,
    /// Sequence number of the last row read.
    pub last_seq: Option<i64>,
}

impl MemoryRepository {
    pub async fn insert(conn: &Connection, seq: i64, memory: &Memory) -> Result<()> {
        let (location_name, latitude, longitude) = location_columns(memory.location.as_ref());

        conn.execute(
            r#"
            INSERT INTO memories (
                id, seq, title, description, timestamp, location_name, latitude, longitude,
                tags, people, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                memory.id.clone(),
                seq,
                memory.title.clone(),
                memory.description.clone(),
                format_timestamp(&memory.timestamp),
                location_name,
                latitude,
                longitude,
                serde_json::to_string(&memory.tags)?,
                serde_json::to_string(&memory.people)?,
                memory.created_at.to_rfc3339(),
                memory.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        MediaRepository::insert_all(conn, &memory.id, &memory.media).await
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Memory>> {
        let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::with_media(conn, Self::row_to_memory(&row)?).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_seq(conn: &Connection, seq: i64) -> Result<Option<Memory>> {
        let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE seq = ?1");
        let mut rows = conn.query(&sql, params![seq]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::with_media(conn, Self::row_to_memory(&row)?).await?)),
            None => Ok(None),
        }
    }

    pub async fn random(conn: &Connection) -> Result<Option<Memory>> {
        let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories ORDER BY RANDOM() LIMIT 1");
        let mut rows = conn.query(&sql, ()).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::with_media(conn, Self::row_to_memory(&row)?).await?)),
            None => Ok(None),
        }
    }

    /// Keyset page of summaries in insertion order.
    ///
    /// A row that cannot be read is logged and skipped so one bad record does
    /// not end the scan; it still counts towards `scanned`.
    pub async fn list_after(conn: &Connection, after_seq: i64, limit: u32) -> Result<ScanPage> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE seq > ?1 ORDER BY seq LIMIT ?2"
        );
        let mut rows = conn.query(&sql, params![after_seq, limit as i64]).await?;

        let mut page = ScanPage::default();
        let mut memories = Vec::new();
        while let Some(row) = rows.next().await? {
            let seq: i64 = row.get(1)?;
            page.scanned += 1;
            page.last_seq = Some(seq);
            match Self::row_to_memory(&row) {
                Ok(memory) => memories.push(memory),
                Err(e) => warn!(seq, error = %e, "Skipping unreadable memory row"),
            }
        }

        let ids: Vec<String> = memories.iter().map(|m| m.id.clone()).collect();
        let mut media = MediaRepository::summaries_for_memories(conn, &ids).await?;
        page.memories = memories
            .into_iter()
            .map(|memory| {
                let images = media.remove(&memory.id).unwrap_or_default();
                let mut summary = MemorySummary::from(memory);
                summary.filenames = images.filenames;
                summary.primary_image = images.primary;
                summary
            })
            .collect();

        Ok(page)
    }

    /// Overwrite the scalar columns of an existing memory.
    pub async fn update(conn: &Connection, memory: &Memory) -> Result<bool> {
        let (location_name, latitude, longitude) = location_columns(memory.location.as_ref());

        let affected = conn
            .execute(
                r#"
                UPDATE memories SET
                    title = ?2, description = ?3, timestamp = ?4, location_name = ?5,
                    latitude = ?6, longitude = ?7, tags = ?8, people = ?9, updated_at = ?10
                WHERE id = ?1
                "#,
                params![
                    memory.id.clone(),
                    memory.title.clone(),
                    memory.description.clone(),
                    format_timestamp(&memory.timestamp),
                    location_name,
                    latitude,
                    longitude,
                    serde_json::to_string(&memory.tags)?,
                    serde_json::to_string(&memory.people)?,
                    memory.updated_at.to_rfc3339(),
                ],
            )
            .await?;

        Ok(affected > 0)
    }

    pub async fn delete(conn: &Connection, id: &str) -> Result<bool> {
        MediaRepository::delete_for_memory(conn, id).await?;
        let affected = conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])
            .await?;
        Ok(affected > 0)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn.query("SELECT COUNT(*) FROM memories", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    async fn with_media(conn: &Connection, mut memory: Memory) -> Result<Memory> {
        memory.media = MediaRepository::list_for_memory(conn, &memory.id).await?;
        Ok(memory)
    }

    /// Map a row selected with the standard column list; media is left empty.
    pub fn row_to_memory(row: &libsql::Row) -> Result<Memory> {
        let id: String = row.get(0)?;
        let timestamp = parse_timestamp(&row.get::<String>(4)?).ok_or_else(|| {
            KeepsakeError::Internal(format!("stored timestamp for {id} is not RFC 3339"))
        })?;

        let location = row.get::<Option<String>>(5)?.map(|name| {
            let coordinates = match (row.get::<Option<f64>>(6), row.get::<Option<f64>>(7)) {
                (Ok(Some(lat)), Ok(Some(lng))) => Some(Coordinates { lat, lng }),
                _ => None,
            };
            Location { name, coordinates }
        });

        Ok(Memory {
            title: row.get(2)?,
            description: row.get(3)?,
            timestamp,
            location,
            media: Vec::new(),
            tags: parse_stored_json(&id, "tags", &row.get::<String>(8)?)?,
            people: parse_stored_json(&id, "people", &row.get::<String>(9)?)?,
            created_at: parse_stored_time(&id, "created_at", &row.get::<String>(10)?)?,
            updated_at: parse_stored_time(&id, "updated_at", &row.get::<String>(11)?)?,
            id,
        })
    }
}

fn location_columns(location: Option<&Location>) -> (Option<String>, Option<f64>, Option<f64>) {
    match location {
        Some(loc) => (
            Some(loc.name.clone()),
            loc.coordinates.map(|c| c.lat),
            loc.coordinates.map(|c| c.lng),
        ),
        None => (None, None, None),
    }
}

fn parse_stored_time(id: &str, column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KeepsakeError::Internal(format!("stored {column} for {id} is invalid: {e}")))
}

fn parse_stored_json<T: DeserializeOwned>(id: &str, column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| KeepsakeError::Internal(format!("stored {column} for {id} is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::models::{MediaItem, NewMemory, Person};
    use chrono::TimeZone;

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        init_schema(&conn).await.unwrap();
        conn
    }

    fn sample(id: &str, title: &str) -> Memory {
        let ts = Utc.with_ymd_and_hms(2023, 7, 14, 18, 30, 0).unwrap();
        NewMemory {
            title: title.to_string(),
            description: "Fireworks".to_string(),
            timestamp: ts,
            location: Some(Location {
                name: "Paris".to_string(),
                coordinates: Some(Coordinates {
                    lat: 48.85,
                    lng: 2.35,
                }),
            }),
            media: vec![MediaItem {
                filename: "night.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            }],
            tags: vec!["holiday".to_string()],
            people: vec![Person {
                name: "Ana".to_string(),
                relation: "friend".to_string(),
            }],
        }
        .into_memory(id.to_string(), ts)
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let conn = setup_test_db().await;
        let memory = sample("m_001", "Bastille Day");
        MemoryRepository::insert(&conn, 1, &memory).await.unwrap();

        let by_id = MemoryRepository::get_by_id(&conn, "m_001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id, memory);

        let by_seq = MemoryRepository::get_by_seq(&conn, 1).await.unwrap().unwrap();
        assert_eq!(by_seq.id, "m_001");
        assert!(MemoryRepository::get_by_seq(&conn, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_location_without_coordinates() {
        let conn = setup_test_db().await;
        let mut memory = sample("m_001", "Somewhere");
        memory.location = Some(Location {
            name: "Home".to_string(),
            coordinates: None,
        });
        MemoryRepository::insert(&conn, 1, &memory).await.unwrap();

        let loaded = MemoryRepository::get_by_id(&conn, "m_001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.location.unwrap().coordinates, None);
    }

    #[tokio::test]
    async fn test_list_after_pages_in_insertion_order() {
        let conn = setup_test_db().await;
        for seq in 1..=5 {
            let memory = sample(&format!("m_{seq:03}"), &format!("Memory {seq}"));
            MemoryRepository::insert(&conn, seq, &memory).await.unwrap();
        }

        let first = MemoryRepository::list_after(&conn, 0, 2).await.unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.last_seq, Some(2));
        assert_eq!(first.memories[0].filenames, vec!["night.jpg".to_string()]);
        assert!(first.memories[0].primary_image.is_some());

        let rest = MemoryRepository::list_after(&conn, 2, 10).await.unwrap();
        assert_eq!(
            rest.memories.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m_003", "m_004", "m_005"]
        );
    }

    #[tokio::test]
    async fn test_list_after_skips_unreadable_rows() {
        let conn = setup_test_db().await;
        for seq in 1..=3 {
            let memory = sample(&format!("m_{seq:03}"), &format!("Memory {seq}"));
            MemoryRepository::insert(&conn, seq, &memory).await.unwrap();
        }
        conn.execute(
            "UPDATE memories SET timestamp = '+10000-01-01T04:00:00Z' WHERE id = 'm_002'",
            (),
        )
        .await
        .unwrap();

        let page = MemoryRepository::list_after(&conn, 0, 10).await.unwrap();
        assert_eq!(page.scanned, 3);
        assert_eq!(page.last_seq, Some(3));
        assert_eq!(
            page.memories.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m_001", "m_003"]
        );
    }

    #[tokio::test]
    async fn test_corrupt_columns_are_reported() {
        let conn = setup_test_db().await;
        MemoryRepository::insert(&conn, 1, &sample("m_001", "Tags")).await.unwrap();
        MemoryRepository::insert(&conn, 2, &sample("m_002", "Clock")).await.unwrap();
        conn.execute("UPDATE memories SET tags = 'not json' WHERE id = 'm_001'", ())
            .await
            .unwrap();
        conn.execute(
            "UPDATE memories SET created_at = 'yesterday' WHERE id = 'm_002'",
            (),
        )
        .await
        .unwrap();

        for id in ["m_001", "m_002"] {
            let err = MemoryRepository::get_by_id(&conn, id).await.unwrap_err();
            assert!(matches!(err, KeepsakeError::Internal(_)), "{id}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let conn = setup_test_db().await;
        let mut memory = sample("m_001", "Before");
        MemoryRepository::insert(&conn, 1, &memory).await.unwrap();

        memory.title = "After".to_string();
        memory.location = None;
        assert!(MemoryRepository::update(&conn, &memory).await.unwrap());

        let loaded = MemoryRepository::get_by_id(&conn, "m_001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.title, "After");
        assert!(loaded.location.is_none());

        assert!(MemoryRepository::delete(&conn, "m_001").await.unwrap());
        assert!(!MemoryRepository::delete(&conn, "m_001").await.unwrap());
        assert_eq!(MemoryRepository::count(&conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_random_on_empty_table() {
        let conn = setup_test_db().await;
        assert!(MemoryRepository::random(&conn).await.unwrap().is_none());

        MemoryRepository::insert(&conn, 1, &sample("m_001", "Only"))
            .await
            .unwrap();
        let picked = MemoryRepository::random(&conn).await.unwrap().unwrap();
        assert_eq!(picked.id, "m_001");
    }
}
