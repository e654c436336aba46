use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::MediaConfig;
use crate::error::{KeepsakeError, Result};
use crate::media;

use super::{Coordinates, Location, MediaItem};

pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_DESCRIPTION_CHARS: usize = 20_000;
pub const MAX_FILENAME_CHARS: usize = 255;

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("valid regex"))
}

/// Media handling knobs applied while ingesting.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Reject the request when every submitted image fails to decode.
    pub strict: bool,
    pub max_images: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&MediaConfig::default())
    }
}

impl From<&MediaConfig> for IngestOptions {
    fn from(config: &MediaConfig) -> Self {
        Self {
            strict: config.strict,
            max_images: config.max_images,
        }
    }
}

/// An image as submitted: a name and a base64 payload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data_base64: String,
}

/// An image dropped during ingest because its payload did not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct DecodedMedia {
    pub items: Vec<MediaItem>,
    pub skipped: Vec<SkippedImage>,
}

pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(KeepsakeError::validation("title", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(KeepsakeError::validation(
            "title",
            format!("must be at most {MAX_TITLE_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: &str) -> Result<String> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(KeepsakeError::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_CHARS} characters"),
        ));
    }
    Ok(description.to_string())
}

/// Build a location, requiring both or neither coordinate.
pub fn validate_location(name: &str, lat: Option<f64>, lng: Option<f64>) -> Result<Location> {
    let coordinates = match (lat, lng) {
        (None, None) => None,
        (Some(_), None) => {
            return Err(KeepsakeError::validation(
                "location.coordinates.lng",
                "required when lat is supplied",
            ))
        }
        (None, Some(_)) => {
            return Err(KeepsakeError::validation(
                "location.coordinates.lat",
                "required when lng is supplied",
            ))
        }
        (Some(lat), Some(lng)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(KeepsakeError::validation(
                    "location.coordinates.lat",
                    "must be between -90 and 90",
                ));
            }
            if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
                return Err(KeepsakeError::validation(
                    "location.coordinates.lng",
                    "must be between -180 and 180",
                ));
            }
            Some(Coordinates { lat, lng })
        }
    };

    Ok(Location {
        name: name.trim().to_string(),
        coordinates,
    })
}

/// Trim, drop empties and deduplicate case-insensitively, keeping the first spelling.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

pub fn validate_filename(filename: &str, index: usize) -> Result<()> {
    let field = format!("media.images_data[{index}].filename");
    if filename.is_empty() || filename.chars().count() > MAX_FILENAME_CHARS {
        return Err(KeepsakeError::validation(
            field,
            format!("must be 1 to {MAX_FILENAME_CHARS} characters"),
        ));
    }
    if !filename_regex().is_match(filename) {
        return Err(KeepsakeError::validation(
            field,
            "may only contain letters, digits, '.', '_' and '-' and must not start with '.'",
        ));
    }
    Ok(())
}

/// Validate filenames and decode every payload.
///
/// Illegal or duplicate filenames fail the whole request. Undecodable
/// payloads are skipped unless strict mode is on and nothing decoded.
pub fn decode_images(images: Vec<ImageUpload>, options: &IngestOptions) -> Result<DecodedMedia> {
    if images.len() > options.max_images {
        return Err(KeepsakeError::validation(
            "media.images_data",
            format!("at most {} images per memory", options.max_images),
        ));
    }

    let mut seen = HashSet::new();
    for (index, image) in images.iter().enumerate() {
        validate_filename(&image.filename, index)?;
        if !seen.insert(image.filename.as_str()) {
            return Err(KeepsakeError::validation(
                format!("media.images_data[{index}].filename"),
                format!("duplicate filename '{}'", image.filename),
            ));
        }
    }

    let submitted = images.len();
    let mut decoded = DecodedMedia::default();
    for image in images {
        match media::decode(&image.data_base64) {
            Ok(bytes) => decoded.items.push(MediaItem {
                content_type: media::content_type(&bytes).to_string(),
                filename: image.filename,
                bytes,
            }),
            Err(e) => {
                tracing::warn!(filename = %image.filename, error = %e, "Skipping undecodable image");
                decoded.skipped.push(SkippedImage {
                    filename: image.filename,
                    reason: e.to_string(),
                });
            }
        }
    }

    if options.strict && submitted > 0 && decoded.items.is_empty() {
        let first = &decoded.skipped[0];
        return Err(KeepsakeError::decode(
            "media.images_data[0].data_base64",
            format!("'{}' could not be decoded: {}", first.filename, first.reason),
        ));
    }

    Ok(decoded)
}

/// Decode a set that replaces every stored image of a memory.
///
/// Fails when images were submitted and none decoded, whatever the strict
/// setting, so a bad payload cannot wipe the existing images.
pub fn decode_replacement_images(
    images: Vec<ImageUpload>,
    options: &IngestOptions,
) -> Result<DecodedMedia> {
    let options = IngestOptions {
        strict: true,
        ..*options
    };
    decode_images(images, &options)
}
