use chrono::{DateTime, Datelike, SecondsFormat, Utc};

/// Prefix of every memory identifier.
pub const MEMORY_ID_PREFIX: &str = "m_";

/// Format a store sequence number as a memory id (`m_001`, `m_042`, `m_1234`).
pub fn memory_id(seq: i64) -> String {
    format!("{MEMORY_ID_PREFIX}{seq:03}")
}

/// Sequence number encoded in a memory id, if it is one.
pub fn seq_from_id(id: &str) -> Option<i64> {
    let digits = id.strip_prefix(MEMORY_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|seq: &i64| *seq > 0)
}

/// How a caller addressed a memory in a URL path.
///
/// The mobile client strips the `m_` prefix and sends only the number
/// (`/memory/7`), so both forms resolve to the same record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryRef {
    Seq(i64),
    Id(String),
}

impl MemoryRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse().ok().filter(|seq: &i64| *seq > 0).map(Self::Seq);
        }
        seq_from_id(raw).map(|_| Self::Id(raw.to_string()))
    }
}

impl std::fmt::Display for MemoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seq(seq) => write!(f, "{}", memory_id(*seq)),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// RFC 3339 in UTC with a `Z` suffix; sub-second digits only when present.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 3339 only has four-digit years; instants outside them cannot be stored.
pub fn timestamp_in_range(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}
