//! Wire shapes shared by requests and responses.
//!
//! `media` uses the same `{ "images_data": [...] }` envelope on ingest and on
//! read, so the client can round-trip a memory without reshaping it.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KeepsakeError, Result};
use crate::media;
use crate::models::{self, ImageUpload};

/// `{ lat, lng }` as sent by the client. Both or neither must be present.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CoordinatesInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LocationInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<CoordinatesInput>,
}

impl LocationInput {
    pub fn into_location(self) -> Result<models::Location> {
        let coordinates = self.coordinates.unwrap_or_default();
        models::validate_location(&self.name, coordinates.lat, coordinates.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CoordinatesPayload {
    pub lat: f64,
    pub lng: f64,
}

impl From<models::Coordinates> for CoordinatesPayload {
    fn from(c: models::Coordinates) -> Self {
        Self {
            lat: c.lat,
            lng: c.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LocationPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub coordinates: Option<CoordinatesPayload>,
}

impl From<models::Location> for LocationPayload {
    fn from(location: models::Location) -> Self {
        Self {
            name: location.name,
            coordinates: location.coordinates.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PersonPayload {
    pub name: String,
    #[serde(default)]
    pub relation: String,
}

impl From<models::Person> for PersonPayload {
    fn from(person: models::Person) -> Self {
        Self {
            name: person.name,
            relation: person.relation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ImagePayload {
    pub filename: String,
    /// Standard base64 with padding.
    pub data_base64: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MediaPayload {
    #[serde(default)]
    pub images_data: Vec<ImagePayload>,
}

impl MediaPayload {
    pub fn into_uploads(self) -> Vec<ImageUpload> {
        self.images_data
            .into_iter()
            .map(|image| ImageUpload {
                filename: image.filename,
                data_base64: image.data_base64,
            })
            .collect()
    }
}

impl From<Vec<models::MediaItem>> for MediaPayload {
    fn from(items: Vec<models::MediaItem>) -> Self {
        Self {
            images_data: items
                .into_iter()
                .map(|item| ImagePayload {
                    data_base64: media::encode(&item.bytes),
                    filename: item.filename,
                })
                .collect(),
        }
    }
}

/// Trim names and relations; a person without a name is rejected.
pub fn people_from_payload(people: Vec<PersonPayload>) -> Result<Vec<models::Person>> {
    people
        .into_iter()
        .enumerate()
        .map(|(index, person)| {
            let name = person.name.trim();
            if name.is_empty() {
                return Err(KeepsakeError::validation(
                    format!("people[{index}].name"),
                    "must not be empty",
                ));
            }
            Ok(models::Person {
                name: name.to_string(),
                relation: person.relation.trim().to_string(),
            })
        })
        .collect()
}

pub fn parse_timestamp_field(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let timestamp = models::parse_timestamp(raw).ok_or_else(|| {
        KeepsakeError::validation("timestamp", "must be an ISO-8601 timestamp with a UTC offset")
    })?;
    if !models::timestamp_in_range(&timestamp) {
        return Err(KeepsakeError::validation(
            "timestamp",
            "must fall between years 0000 and 9999 once converted to UTC",
        ));
    }
    Ok(timestamp)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
