//! Scene metadata records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one satellite acquisition.
///
/// Records are produced by a [`SceneService`](super::SceneService) query and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Catalogue identifier (unique per scene).
    pub id: String,

    /// Human-readable product name, e.g. `S2B_MSIL2A_20210712T...`.
    #[serde(default)]
    pub title: String,

    /// When the product was ingested into the catalogue.
    pub ingestion_date: DateTime<Utc>,

    /// Cloud-cover percentage, 0-100.
    pub cloud_cover: f64,

    /// When the product was generated by the ground segment.
    pub generation_date: DateTime<Utc>,

    /// Footprint reference (WKT polygon as reported by the catalogue).
    #[serde(default)]
    pub footprint: String,
}

impl SceneRecord {
    /// Create a record; the generation date defaults to the ingestion date.
    pub fn new(id: impl Into<String>, ingestion_date: DateTime<Utc>, cloud_cover: f64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            ingestion_date,
            cloud_cover,
            generation_date: ingestion_date,
            footprint: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_generation_date(mut self, date: DateTime<Utc>) -> Self {
        self.generation_date = date;
        self
    }

    pub fn with_footprint(mut self, wkt: impl Into<String>) -> Self {
        self.footprint = wkt.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_defaults_generation_date() {
        let date = Utc.with_ymd_and_hms(2021, 7, 12, 6, 0, 0).unwrap();
        let record = SceneRecord::new("abc", date, 3.5);
        assert_eq!(record.generation_date, date);
        assert!(record.title.is_empty());
    }

    #[test]
    fn test_deserialize_from_catalogue_json() {
        let json = r#"{
            "id": "6f1c",
            "title": "S2A_MSIL2A_20210801",
            "ingestion_date": "2021-08-01T10:00:00Z",
            "cloud_cover": 7.25,
            "generation_date": "2021-08-01T12:30:00Z"
        }"#;
        let record: SceneRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "6f1c");
        assert_eq!(record.cloud_cover, 7.25);
        assert!(record.footprint.is_empty());
        assert!(record.generation_date > record.ingestion_date);
    }
}
