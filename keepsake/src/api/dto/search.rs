use serde::{Deserialize, Serialize};

use super::common::CoordinatesPayload;
use crate::models::{self, SearchResult};

/// Query parameters for `GET /search`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(deny_unknown_fields)]
pub struct SearchQuery {
    /// Case-insensitive substring. Empty or absent returns every memory.
    pub q: Option<String>,
    /// Maximum number of results; must be at least 1 when given.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SearchLocationPayload {
    pub name: String,
    pub coordinates: CoordinatesPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SearchMediaPayload {
    /// Paths of the form `/memory/{id}/media/{filename}`.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SearchResultResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: String,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<SearchLocationPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub media: Option<SearchMediaPayload>,
}

impl From<SearchResult> for SearchResultResponse {
    fn from(result: SearchResult) -> Self {
        let media = (!result.image_filenames.is_empty()).then(|| SearchMediaPayload {
            images: result
                .image_filenames
                .iter()
                .map(|filename| format!("/memory/{}/media/{filename}", result.id))
                .collect(),
        });

        Self {
            timestamp: models::format_timestamp(&result.timestamp),
            location: result.location.map(|loc| SearchLocationPayload {
                name: loc.name,
                coordinates: loc.coordinates.into(),
            }),
            media,
            id: result.id,
            title: result.title,
            description: result.description,
            keywords: result.keywords,
        }
    }
}
