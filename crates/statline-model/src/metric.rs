//! The closed metric identifier table.
//!
//! Every exported record carries one of these ids. Ids are stable wire
//! values grouped in blocks by subsystem; the counter/gauge split drives
//! both delta semantics and zero-value suppression downstream, so it
//! lives here in one table instead of being re-derived per consumer.

use serde::{Deserialize, Serialize};

/// How a metric behaves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Monotonically accumulating since process start; differenced
    /// across cycles and suppressed when a delta reads zero.
    Counter,
    /// Instantaneous value; reported verbatim every cycle, zero included.
    Gauge,
}

/// Stable numeric identifier for an exported metric.
///
/// Serialized as its numeric value on every wire (JSON, SQL, config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u32)]
pub enum MetricId {
    // Requests (1000–1099)
    RequestsTotal = 1000,
    RequestsSuccess = 1001,
    RequestsFailed = 1002,
    RequestsPending = 1003,
    BytesSent = 1010,
    BytesReceived = 1011,

    // Per-source breakdowns (1100–1199); records carry the source name
    // (and result code) in their dimension tag.
    SourceTotal = 1100,
    SourceSuccess = 1101,
    SourceFailed = 1102,
    SourceResultCode = 1103,

    // Performance (1300–1399)
    RequestRate = 1300,
    LatencyAvg = 1301,
    LatencyP50 = 1302,
    LatencyP95 = 1303,
    LatencyP99 = 1304,

    // Cache extension (1400–1499)
    CacheHits = 1400,
    CacheMisses = 1401,
    CacheHitRate = 1402,
    CacheSize = 1403,
    CacheEvictions = 1404,

    // Store extension (1500–1599)
    StoreQueries = 1500,
    StoreInserts = 1501,
    StoreUpdates = 1502,
    StoreDeletes = 1503,
    StoreErrors = 1504,
    StoreActiveQueries = 1505,

    // Connections (1700–1799)
    ConnectionsActive = 1700,
    ConnectionsTotal = 1701,
    ConnectionsFailed = 1702,
    ConnectionsClosed = 1703,
}

/// Every defined metric id, in table order.
pub const ALL_METRICS: [MetricId; 30] = [
    MetricId::RequestsTotal,
    MetricId::RequestsSuccess,
    MetricId::RequestsFailed,
    MetricId::RequestsPending,
    MetricId::BytesSent,
    MetricId::BytesReceived,
    MetricId::SourceTotal,
    MetricId::SourceSuccess,
    MetricId::SourceFailed,
    MetricId::SourceResultCode,
    MetricId::RequestRate,
    MetricId::LatencyAvg,
    MetricId::LatencyP50,
    MetricId::LatencyP95,
    MetricId::LatencyP99,
    MetricId::CacheHits,
    MetricId::CacheMisses,
    MetricId::CacheHitRate,
    MetricId::CacheSize,
    MetricId::CacheEvictions,
    MetricId::StoreQueries,
    MetricId::StoreInserts,
    MetricId::StoreUpdates,
    MetricId::StoreDeletes,
    MetricId::StoreErrors,
    MetricId::StoreActiveQueries,
    MetricId::ConnectionsActive,
    MetricId::ConnectionsTotal,
    MetricId::ConnectionsFailed,
    MetricId::ConnectionsClosed,
];

impl MetricId {
    /// Counter/gauge classification. Gauges are exactly the
    /// instantaneous fields of the snapshot model.
    pub fn kind(self) -> MetricKind {
        match self {
            MetricId::RequestsPending
            | MetricId::RequestRate
            | MetricId::LatencyAvg
            | MetricId::LatencyP50
            | MetricId::LatencyP95
            | MetricId::LatencyP99
            | MetricId::CacheHitRate
            | MetricId::CacheSize
            | MetricId::StoreActiveQueries
            | MetricId::ConnectionsActive => MetricKind::Gauge,
            _ => MetricKind::Counter,
        }
    }

    /// Stable human-readable name, for dashboards and log lines.
    pub fn name(self) -> &'static str {
        match self {
            MetricId::RequestsTotal => "total_requests",
            MetricId::RequestsSuccess => "successful_requests",
            MetricId::RequestsFailed => "failed_requests",
            MetricId::RequestsPending => "pending_requests",
            MetricId::BytesSent => "bytes_sent",
            MetricId::BytesReceived => "bytes_received",
            MetricId::SourceTotal => "source_total",
            MetricId::SourceSuccess => "source_success",
            MetricId::SourceFailed => "source_failed",
            MetricId::SourceResultCode => "source_result_code",
            MetricId::RequestRate => "requests_per_second",
            MetricId::LatencyAvg => "avg_latency_ms",
            MetricId::LatencyP50 => "p50_latency_ms",
            MetricId::LatencyP95 => "p95_latency_ms",
            MetricId::LatencyP99 => "p99_latency_ms",
            MetricId::CacheHits => "cache_hits",
            MetricId::CacheMisses => "cache_misses",
            MetricId::CacheHitRate => "cache_hit_rate",
            MetricId::CacheSize => "cache_size",
            MetricId::CacheEvictions => "cache_evictions",
            MetricId::StoreQueries => "store_queries",
            MetricId::StoreInserts => "store_inserts",
            MetricId::StoreUpdates => "store_updates",
            MetricId::StoreDeletes => "store_deletes",
            MetricId::StoreErrors => "store_errors",
            MetricId::StoreActiveQueries => "store_active_queries",
            MetricId::ConnectionsActive => "active_connections",
            MetricId::ConnectionsTotal => "total_connections",
            MetricId::ConnectionsFailed => "failed_connections",
            MetricId::ConnectionsClosed => "closed_connections",
        }
    }

    /// Measurement unit, for the metadata catalogue.
    pub fn unit(self) -> &'static str {
        match self {
            MetricId::BytesSent | MetricId::BytesReceived => "bytes",
            MetricId::RequestRate => "requests/sec",
            MetricId::LatencyAvg
            | MetricId::LatencyP50
            | MetricId::LatencyP95
            | MetricId::LatencyP99 => "milliseconds",
            MetricId::CacheHitRate => "percent",
            MetricId::CacheSize => "entries",
            _ => "count",
        }
    }
}

impl From<MetricId> for u32 {
    fn from(id: MetricId) -> u32 {
        id as u32
    }
}

impl TryFrom<u32> for MetricId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ALL_METRICS
            .into_iter()
            .find(|id| *id as u32 == value)
            .ok_or_else(|| format!("unknown metric id: {value}"))
    }
}

/// Catalogue entry describing one metric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricMeta {
    pub id: MetricId,
    pub name: &'static str,
    pub unit: &'static str,
    pub kind: MetricKind,
}

/// The full metric catalogue, one entry per defined id.
pub fn metadata() -> Vec<MetricMeta> {
    ALL_METRICS
        .into_iter()
        .map(|id| MetricMeta {
            id,
            name: id.name(),
            unit: id.unit(),
            kind: id.kind(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn gauges_are_the_instantaneous_fields() {
        let gauges: Vec<MetricId> = ALL_METRICS
            .into_iter()
            .filter(|id| id.kind() == MetricKind::Gauge)
            .collect();
        assert_eq!(
            gauges,
            vec![
                MetricId::RequestsPending,
                MetricId::RequestRate,
                MetricId::LatencyAvg,
                MetricId::LatencyP50,
                MetricId::LatencyP95,
                MetricId::LatencyP99,
                MetricId::CacheHitRate,
                MetricId::CacheSize,
                MetricId::StoreActiveQueries,
                MetricId::ConnectionsActive,
            ]
        );
    }

    #[test]
    fn wire_values_round_trip() {
        for id in ALL_METRICS {
            let value = u32::from(id);
            assert_eq!(MetricId::try_from(value).unwrap(), id);
        }
    }

    #[test]
    fn unknown_wire_value_is_rejected() {
        assert!(MetricId::try_from(9999).is_err());
        assert!(MetricId::try_from(0).is_err());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&MetricId::RequestsTotal).unwrap();
        assert_eq!(json, "1000");
        let back: MetricId = serde_json::from_str("1000").unwrap();
        assert_eq!(back, MetricId::RequestsTotal);
    }

    #[test]
    fn catalogue_ids_and_names_are_unique() {
        let catalogue = metadata();
        assert_eq!(catalogue.len(), ALL_METRICS.len());

        let ids: HashSet<u32> = catalogue.iter().map(|m| u32::from(m.id)).collect();
        assert_eq!(ids.len(), catalogue.len());

        let names: HashSet<&str> = catalogue.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), catalogue.len());
    }
}
