use chrono::{DateTime, Utc};

use super::{Coordinates, MemorySummary};

/// A memory matched by a keyword query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub location: Option<SearchLocation>,
    pub image_filenames: Vec<String>,
}

/// Location of a search hit. Only emitted when coordinates are known.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchLocation {
    pub name: String,
    pub coordinates: Coordinates,
}

impl From<&MemorySummary> for SearchResult {
    fn from(memory: &MemorySummary) -> Self {
        let location = memory.location.as_ref().and_then(|loc| {
            loc.coordinates.map(|coordinates| SearchLocation {
                name: loc.name.clone(),
                coordinates,
            })
        });

        Self {
            id: memory.id.clone(),
            title: memory.title.clone(),
            description: memory.description.clone(),
            timestamp: memory.timestamp,
            keywords: memory.tags.clone(),
            location,
            image_filenames: memory.filenames.clone(),
        }
    }
}

/// Case-insensitive substring match over title, description, tags and people.
///
/// `needle` must already be lowercased. An empty needle matches everything.
pub fn memory_matches(memory: &MemorySummary, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    memory.title.to_lowercase().contains(needle)
        || memory.description.to_lowercase().contains(needle)
        || memory
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle))
        || memory
            .people
            .iter()
            .any(|p| p.name.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, MediaItem, NewMemory, Person};
    use chrono::TimeZone;

    fn memory() -> MemorySummary {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        NewMemory {
            title: "Beach Day".to_string(),
            description: "Sand castles with the kids".to_string(),
            timestamp: ts,
            location: Some(Location {
                name: "Brighton".to_string(),
                coordinates: None,
            }),
            media: vec![MediaItem {
                filename: "a.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![1, 2, 3],
            }],
            tags: vec!["Summer".to_string()],
            people: vec![Person {
                name: "Grandma Rose".to_string(),
                relation: "family".to_string(),
            }],
        }
        .into_memory("m_001".to_string(), ts)
        .into()
    }

    #[test]
    fn matches_any_text_field_case_insensitively() {
        let m = memory();
        assert!(memory_matches(&m, "beach"));
        assert!(memory_matches(&m, "castles"));
        assert!(memory_matches(&m, "summer"));
        assert!(memory_matches(&m, "rose"));
        assert!(memory_matches(&m, ""));
        assert!(!memory_matches(&m, "mountain"));
    }

    #[test]
    fn location_without_coordinates_is_dropped() {
        let result = SearchResult::from(&memory());
        assert!(result.location.is_none());
        assert_eq!(result.keywords, vec!["Summer".to_string()]);
        assert_eq!(result.image_filenames, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn location_with_coordinates_is_kept() {
        let mut m = memory();
        m.location = Some(Location {
            name: "Brighton".to_string(),
            coordinates: Some(Coordinates {
                lat: 50.82,
                lng: -0.14,
            }),
        });
        let result = SearchResult::from(&m);
        assert_eq!(result.location.map(|l| l.name), Some("Brighton".to_string()));
    }
}
