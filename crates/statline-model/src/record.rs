//! The flat, sink-agnostic record emitted per metric per cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metric::MetricId;

/// One time-series data point, produced by the transformer.
///
/// Wire shape (JSON):
///
/// ```json
/// {"counter_id": 1000, "value": 50.0, "dimension_tag": "http:200",
///  "host": "node-1", "system": "gateway", "timestamp": "2025-06-01T12:00:00Z"}
/// ```
///
/// `dimension_tag` is omitted entirely when the record has no dimension.
/// Ordering among the records of one cycle is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Stable numeric metric identifier.
    #[serde(rename = "counter_id")]
    pub metric: MetricId,
    pub value: f64,
    /// Dimension tag, e.g. a source name or `"<source>:<code>"`.
    #[serde(
        rename = "dimension_tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dimension: Option<String>,
    /// Host the snapshot was taken on.
    pub host: String,
    /// Logical system name.
    pub system: String,
    /// Snapshot timestamp, RFC 3339 on the wire.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_record(dimension: Option<&str>) -> MetricRecord {
        MetricRecord {
            metric: MetricId::RequestsTotal,
            value: 50.0,
            dimension: dimension.map(str::to_string),
            host: "node-1".to_string(),
            system: "gateway".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn wire_shape() {
        let json = serde_json::to_value(test_record(Some("http:200"))).unwrap();
        assert_eq!(json["counter_id"], 1000);
        assert_eq!(json["value"], 50.0);
        assert_eq!(json["dimension_tag"], "http:200");
        assert_eq!(json["host"], "node-1");
        assert_eq!(json["system"], "gateway");
        assert_eq!(json["timestamp"], "2025-06-01T12:00:00Z");
    }

    #[test]
    fn dimension_tag_omitted_when_absent() {
        let json = serde_json::to_value(test_record(None)).unwrap();
        assert!(json.get("dimension_tag").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let record = test_record(Some("http"));
        let json = serde_json::to_string(&record).unwrap();
        let back: MetricRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
