//! Snapshot types — the unit of statistics state at one point in time.
//!
//! A snapshot is produced by the host service's collector once per export
//! cycle and treated as immutable from then on. Counters accumulate
//! monotonically since process start; gauges are instantaneous and may
//! fall as well as rise. Which field is which is decided by the
//! `MetricId` table in `metric.rs`, not here — these types carry values,
//! not policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics state of one service at one point in time.
///
/// Producers are trusted: internal consistency between counters
/// (e.g. success + failed ≤ total) is not enforced at this layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Logical name of the service that produced this snapshot.
    #[serde(default)]
    pub service: String,
    /// When the snapshot was taken.
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub connections: ConnectionStats,
    #[serde(default)]
    pub requests: RequestStats,
    #[serde(default)]
    pub performance: PerformanceStats,
    /// Typed extension slots for domain-specific stats blocks.
    #[serde(default)]
    pub extensions: Extensions,
}

// ── Connections ───────────────────────────────────────────────────

/// Connection-level statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionStats {
    /// Total connections ever established (counter).
    pub total: u64,
    /// Currently open connections (gauge).
    pub active: u64,
    /// Failed connection attempts (counter).
    pub failed: u64,
    /// Gracefully closed connections (counter).
    pub closed: u64,
}

// ── Requests ──────────────────────────────────────────────────────

/// Request/response statistics, with a per-source breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestStats {
    /// Total requests processed (counter).
    pub total: u64,
    /// Successful requests (counter).
    pub success: u64,
    /// Failed requests (counter).
    pub failed: u64,
    /// Requests currently in flight (gauge).
    pub pending: u64,
    /// Total bytes sent (counter).
    pub bytes_sent: u64,
    /// Total bytes received (counter).
    pub bytes_received: u64,
    /// Breakdown keyed by source interface name. Keys are open-ended:
    /// new sources may appear between snapshots.
    #[serde(default)]
    pub by_source: HashMap<String, SourceStats>,
}

/// Statistics for a single source interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    /// Result-code distribution for this source (counters).
    #[serde(default)]
    pub by_code: HashMap<u16, u64>,
}

// ── Performance ───────────────────────────────────────────────────

/// Performance statistics. Every field is a gauge: reported verbatim
/// each cycle, never differenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceStats {
    /// Request throughput (requests per second).
    pub request_rate: f64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

// ── Extensions ────────────────────────────────────────────────────

/// Named, explicitly-typed extension slots.
///
/// Each domain that carries extra stats gets its own `Option` slot; the
/// capability check is `is_some()`. The delta engine recurses into each
/// present slot structurally, and a slot absent in the previous snapshot
/// is treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreStats>,
}

/// Cache statistics extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStats {
    /// Cache hits (counter).
    pub hits: u64,
    /// Cache misses (counter).
    pub misses: u64,
    /// Entries evicted (counter).
    pub evictions: u64,
    /// Hit rate percentage (gauge).
    pub hit_rate: f64,
    /// Current entry count (gauge).
    pub size: u64,
}

/// Backing-store statistics extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreStats {
    /// Queries executed (counter).
    pub queries: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    /// Failed store operations (counter).
    pub errors: u64,
    /// Queries currently executing (gauge).
    pub active_queries: u64,
}
