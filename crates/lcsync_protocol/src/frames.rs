//! Response and stream frames.

use crate::record::SyncRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sync response frame: the new anchor plus every matching record.
///
/// Sent as the body of a poll response and as one frame per non-empty
/// tick on push and duplex connections. Records are always sorted
/// ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFrame {
    /// The anchor the client should resume from.
    pub last_sync_time: DateTime<Utc>,
    /// Records newer than the previous anchor, ascending by timestamp.
    pub records: Vec<SyncRecord>,
}

impl SyncFrame {
    /// Creates a frame.
    pub fn new(last_sync_time: DateTime<Utc>, records: Vec<SyncRecord>) -> Self {
        Self {
            last_sync_time,
            records,
        }
    }

    /// Creates a frame with no records.
    pub fn empty(last_sync_time: DateTime<Utc>) -> Self {
        Self::new(last_sync_time, Vec::new())
    }
}

/// An error reported back on an open duplex connection.
///
/// The connection stays open after an error frame; only the offending
/// message is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable error message.
    pub error: String,
    /// HTTP-style status code (400 for rejected input).
    pub status: u16,
}

impl ErrorFrame {
    /// Creates a 400 error frame.
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: 400,
        }
    }
}

/// A frame travelling on a push or duplex connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    /// A delivery of records.
    Sync(SyncFrame),
    /// An error reply to a rejected inbound message (duplex only).
    Error(ErrorFrame),
}

impl StreamFrame {
    /// Returns the sync frame, if this is a delivery.
    pub fn as_sync(&self) -> Option<&SyncFrame> {
        match self {
            StreamFrame::Sync(frame) => Some(frame),
            StreamFrame::Error(_) => None,
        }
    }

    /// Returns the error frame, if this is an error reply.
    pub fn as_error(&self) -> Option<&ErrorFrame> {
        match self {
            StreamFrame::Sync(_) => None,
            StreamFrame::Error(frame) => Some(frame),
        }
    }
}

/// Body of an ingest request.
///
/// The timestamp travels as a raw string so the handler can reject
/// unparseable input with a 400 instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Instant the event was produced, ISO-8601.
    pub timestamp: String,
    /// Opaque record identifier.
    pub record_id: String,
    /// Opaque domain payload.
    #[serde(default)]
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn sync_frame_wire_shape() {
        let frame = SyncFrame::new(at(10), vec![SyncRecord::new("ev-1", at(9))]);
        let value = serde_json::to_value(&frame).unwrap();

        assert!(value["lastSyncTime"].is_string());
        assert_eq!(value["records"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_frame() {
        let frame = SyncFrame::empty(at(10));
        assert!(frame.records.is_empty());
    }

    #[test]
    fn error_frame_status() {
        let frame = ErrorFrame::bad_request("lastSyncTime isn't a valid ISO date");
        assert_eq!(frame.status, 400);

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["status"], 400);
    }

    #[test]
    fn stream_frame_untagged() {
        let sync = StreamFrame::Sync(SyncFrame::empty(at(10)));
        let value = serde_json::to_value(&sync).unwrap();
        // No enum tag on the wire
        assert!(value.get("Sync").is_none());
        assert!(value["lastSyncTime"].is_string());

        let error = StreamFrame::Error(ErrorFrame::bad_request("bad"));
        assert!(error.as_error().is_some());
        assert!(error.as_sync().is_none());
    }

    #[test]
    fn ingest_request_camel_case() {
        let raw = serde_json::json!({
            "timestamp": "2024-01-01T10:00:00Z",
            "recordId": "ev-9",
            "payload": {"direction": "Antwerp"}
        });

        let request: IngestRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.record_id, "ev-9");
        assert_eq!(request.payload["direction"], "Antwerp");
    }

    #[test]
    fn ingest_request_payload_optional() {
        let raw = serde_json::json!({
            "timestamp": "2024-01-01T10:00:00Z",
            "recordId": "ev-10"
        });

        let request: IngestRequest = serde_json::from_value(raw).unwrap();
        assert!(request.payload.is_null());
    }
}
