use serde::{Deserialize, Serialize};

use crate::media;
use crate::models::{self, TimelineEntry};

/// Query parameters for `GET /timeline`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(deny_unknown_fields)]
pub struct TimelineQuery {
    /// Restrict the listing to one UTC calendar year.
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TimelineEntryResponse {
    pub id: String,
    pub title: String,
    pub timestamp: String,
    /// Base64 JPEG of the first image, absent when none could be rendered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail_base64: Option<String>,
}

impl From<TimelineEntry> for TimelineEntryResponse {
    fn from(entry: TimelineEntry) -> Self {
        Self {
            timestamp: models::format_timestamp(&entry.timestamp),
            thumbnail_base64: entry.thumbnail.as_deref().map(media::encode),
            id: entry.id,
            title: entry.title,
        }
    }
}
