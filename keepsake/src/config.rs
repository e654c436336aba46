use serde::Deserialize;
use std::env;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub timeline: TimelineConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body; uploads carry images inline as base64.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Fail an upload when every submitted image is undecodable.
    pub strict: bool,
    pub max_images: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Longest side, in pixels, of generated thumbnails.
    pub thumbnail_size: u32,
    pub retry_max_elapsed_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Number of cached queries. Zero disables the cache.
    pub cache_size: usize,
    /// Rows fetched per page while scanning the store.
    pub page_size: u32,
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT`. Runs before the subscriber exists, so bad values fall back silently.
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_images: 32,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 256,
            retry_max_elapsed_secs: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_size: 256,
            page_size: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let media = MediaConfig::default();
        let timeline = TimelineConfig::default();
        let search = SearchConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("KEEPSAKE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("KEEPSAKE_PORT", 5004),
                max_body_bytes: parse_env_or("KEEPSAKE_MAX_BODY_BYTES", 64 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:keepsake.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            media: MediaConfig {
                strict: parse_env_or("MEDIA_STRICT", media.strict),
                max_images: parse_env_or("MEDIA_MAX_IMAGES", media.max_images),
            },
            timeline: TimelineConfig {
                thumbnail_size: parse_env_or("TIMELINE_THUMBNAIL_SIZE", timeline.thumbnail_size)
                    .max(16),
                retry_max_elapsed_secs: parse_env_or(
                    "TIMELINE_RETRY_MAX_ELAPSED_SECS",
                    timeline.retry_max_elapsed_secs,
                ),
            },
            search: SearchConfig {
                cache_size: parse_env_or("SEARCH_CACHE_SIZE", search.cache_size),
                page_size: parse_env_or("SEARCH_PAGE_SIZE", search.page_size).max(1),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Configuration for tests and embedding: a local database file and default tuning.
    pub fn for_database_url(url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_body_bytes: 64 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: url.into(),
                auth_token: None,
                local_path: None,
                busy_timeout_ms: 5000,
                journal_mode: "WAL".to_string(),
                synchronous: "NORMAL".to_string(),
            },
            media: MediaConfig::default(),
            timeline: TimelineConfig::default(),
            search: SearchConfig::default(),
        }
    }
}
