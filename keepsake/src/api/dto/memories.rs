//! Memory request/response DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{
    double_option, parse_timestamp_field, people_from_payload, LocationInput, LocationPayload,
    MediaPayload, PersonPayload,
};
use crate::error::{KeepsakeError, Result};
use crate::models::{self, IngestOptions, MemoryPatch, NewMemory, SkippedImage};

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /memory/upload`.
///
/// Fields are checked in declaration order and the first failure is reported.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UploadMemoryRequest {
    /// Client-side identifier. Accepted for compatibility and ignored; the
    /// server assigns ids.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub id: Option<serde_json::Value>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO-8601 instant with an offset, e.g. `2024-06-01T12:00:00Z`.
    pub timestamp: String,
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default, alias = "keywords")]
    #[validate(length(max = 100))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub people: Vec<PersonPayload>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
}

/// Fields carrying `validator` rules, in declaration order.
const LIST_FIELDS: &[&str] = &["tags", "people"];

impl UploadMemoryRequest {
    /// Validate every field and decode the inline images.
    pub fn into_new_memory(self, options: &IngestOptions) -> Result<(NewMemory, Vec<SkippedImage>)> {
        let lists = self.validate();
        let title = models::validate_title(&self.title)?;
        let description = models::validate_description(&self.description)?;
        let timestamp = parse_timestamp_field(&self.timestamp)?;
        let location = self.location.map(LocationInput::into_location).transpose()?;
        lists.map_err(|e| KeepsakeError::from_validation(e, LIST_FIELDS))?;
        let people = people_from_payload(self.people)?;
        let decoded = models::decode_images(
            self.media.map(MediaPayload::into_uploads).unwrap_or_default(),
            options,
        )?;

        let memory = NewMemory {
            title,
            description,
            timestamp,
            location,
            media: decoded.items,
            tags: models::normalize_tags(self.tags),
            people,
        };
        Ok((memory, decoded.skipped))
    }
}

/// Request body for `PATCH /memory/{id}`. Absent fields are left untouched;
/// `"location": null` clears the location and `media` replaces every image.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMemoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<LocationInput>)]
    pub location: Option<Option<LocationInput>>,
    #[serde(default, alias = "keywords")]
    #[validate(length(max = 100))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 100))]
    pub people: Option<Vec<PersonPayload>>,
    /// Replaces every stored image. Rejected with `invalid_media` when images
    /// are supplied and none of them decode.
    pub media: Option<MediaPayload>,
}

impl UpdateMemoryRequest {
    pub fn into_patch(self, options: &IngestOptions) -> Result<(MemoryPatch, Vec<SkippedImage>)> {
        let lists = self.validate();
        let title = self.title.as_deref().map(models::validate_title).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(models::validate_description)
            .transpose()?;
        let timestamp = self.timestamp.as_deref().map(parse_timestamp_field).transpose()?;
        let location = match self.location {
            Some(Some(input)) => Some(Some(input.into_location()?)),
            Some(None) => Some(None),
            None => None,
        };
        lists.map_err(|e| KeepsakeError::from_validation(e, LIST_FIELDS))?;
        let people = self.people.map(people_from_payload).transpose()?;

        let mut skipped = Vec::new();
        let media = match self.media {
            Some(media) => {
                let decoded = models::decode_replacement_images(media.into_uploads(), options)?;
                skipped = decoded.skipped;
                Some(decoded.items)
            }
            None => None,
        };

        let patch = MemoryPatch {
            title,
            description,
            timestamp,
            location,
            media,
            tags: self.tags.map(models::normalize_tags),
            people,
        };
        Ok((patch, skipped))
    }
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// A stored memory as returned by every memory endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MemoryResponse {
    /// Server-assigned id, `m_` followed by a zero-padded sequence number.
    pub id: String,
    pub title: String,
    pub description: String,
    /// RFC 3339 in UTC.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<LocationPayload>,
    pub media: MediaPayload,
    pub tags: Vec<String>,
    pub people: Vec<PersonPayload>,
}

impl From<models::Memory> for MemoryResponse {
    fn from(memory: models::Memory) -> Self {
        Self {
            timestamp: models::format_timestamp(&memory.timestamp),
            id: memory.id,
            title: memory.title,
            description: memory.description,
            location: memory.location.map(Into::into),
            media: memory.media.into(),
            tags: memory.tags,
            people: memory.people.into_iter().map(Into::into).collect(),
        }
    }
}
