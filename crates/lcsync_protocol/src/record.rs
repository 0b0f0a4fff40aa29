//! Event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single timestamped event record.
///
/// Records are immutable once appended to a store. The `id` and
/// `timestamp` fields are the only ones the sync core interprets;
/// everything else in the JSON object is opaque domain payload and is
/// carried through untouched via `#[serde(flatten)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Opaque record identifier.
    pub id: String,
    /// Instant the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Opaque domain payload (all remaining JSON fields).
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SyncRecord {
    /// Creates a record with an empty payload.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            payload: Map::new(),
        }
    }

    /// Creates a record with a domain payload.
    pub fn with_payload(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn serialize_camel_case() {
        let record = SyncRecord::new("ev-1", Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "ev-1");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-01-01T10:00:00"));
    }

    #[test]
    fn payload_fields_flattened() {
        let mut payload = Map::new();
        payload.insert("departureDelay".into(), json!(60));
        payload.insert("direction".into(), json!("Brussels"));

        let record = SyncRecord::with_payload(
            "ev-2",
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
            payload,
        );
        let value = serde_json::to_value(&record).unwrap();

        // Domain fields sit at the top level, not nested under "payload"
        assert_eq!(value["departureDelay"], 60);
        assert_eq!(value["direction"], "Brussels");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn deserialize_keeps_unknown_fields() {
        let raw = json!({
            "id": "ev-3",
            "timestamp": "2024-01-01T12:00:00Z",
            "gtfs:trip": "trip-99",
            "arrivalDelay": 120
        });

        let record: SyncRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.id, "ev-3");
        assert_eq!(record.payload["gtfs:trip"], "trip-99");
        assert_eq!(record.payload["arrivalDelay"], 120);
    }

    #[test]
    fn round_trip() {
        let raw = json!({
            "id": "ev-4",
            "timestamp": "2024-01-01T12:00:00Z",
            "direction": "Ghent"
        });

        let record: SyncRecord = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["id"], raw["id"]);
        assert_eq!(back["direction"], raw["direction"]);
    }
}
