//! Snapshot → flat metric records.
//!
//! Emission is driven by `MetricId::kind()`: in a delta snapshot a
//! counter reading zero means "no activity this interval" and is
//! suppressed, while a gauge's zero is real state (zero open
//! connections) and always emits. The transformer is agnostic to whether
//! its input is a raw or delta snapshot.

use std::collections::HashSet;

use statline_model::{MetricId, MetricKind, MetricRecord, Snapshot};

/// Include/exclude filtering over metric ids.
///
/// Exclude is checked first and always wins; a non-empty include list
/// then restricts output to the listed ids.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    include: HashSet<MetricId>,
    exclude: HashSet<MetricId>,
}

impl MetricFilter {
    pub fn new(
        include: impl IntoIterator<Item = MetricId>,
        exclude: impl IntoIterator<Item = MetricId>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    /// Whether records for this id survive filtering.
    pub fn passes(&self, id: MetricId) -> bool {
        if self.exclude.contains(&id) {
            return false;
        }
        self.include.is_empty() || self.include.contains(&id)
    }

    /// A filter with no include or exclude entries passes everything.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Deterministic mapping from a snapshot to flat metric records.
///
/// Stateless apart from the host/system identity stamped on every
/// record; no I/O, no error conditions. Absent optional sub-structures
/// are skipped, never fatal.
#[derive(Debug, Clone)]
pub struct Transformer {
    host: String,
    system: String,
    filter: MetricFilter,
}

impl Transformer {
    pub fn new(host: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            system: system.into(),
            filter: MetricFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Flatten a snapshot into records, one per live metric.
    pub fn transform(&self, snapshot: &Snapshot) -> Vec<MetricRecord> {
        let mut records: Vec<MetricRecord> = Vec::with_capacity(64);

        {
            let mut emit = |id: MetricId, value: f64, dimension: Option<String>| {
                if id.kind() == MetricKind::Counter && value == 0.0 {
                    return;
                }
                records.push(MetricRecord {
                    metric: id,
                    value,
                    dimension,
                    host: self.host.clone(),
                    system: self.system.clone(),
                    timestamp: snapshot.timestamp,
                });
            };

            let requests = &snapshot.requests;
            emit(MetricId::RequestsTotal, requests.total as f64, None);
            emit(MetricId::RequestsSuccess, requests.success as f64, None);
            emit(MetricId::RequestsFailed, requests.failed as f64, None);
            emit(MetricId::RequestsPending, requests.pending as f64, None);
            emit(MetricId::BytesSent, requests.bytes_sent as f64, None);
            emit(
                MetricId::BytesReceived,
                requests.bytes_received as f64,
                None,
            );

            let connections = &snapshot.connections;
            emit(
                MetricId::ConnectionsActive,
                connections.active as f64,
                None,
            );
            emit(MetricId::ConnectionsTotal, connections.total as f64, None);
            emit(
                MetricId::ConnectionsFailed,
                connections.failed as f64,
                None,
            );
            emit(
                MetricId::ConnectionsClosed,
                connections.closed as f64,
                None,
            );

            let performance = &snapshot.performance;
            emit(MetricId::RequestRate, performance.request_rate, None);
            emit(MetricId::LatencyAvg, performance.latency_avg_ms, None);
            emit(MetricId::LatencyP50, performance.latency_p50_ms, None);
            emit(MetricId::LatencyP95, performance.latency_p95_ms, None);
            emit(MetricId::LatencyP99, performance.latency_p99_ms, None);

            for (source, stats) in &requests.by_source {
                emit(
                    MetricId::SourceTotal,
                    stats.total as f64,
                    Some(source.clone()),
                );
                emit(
                    MetricId::SourceSuccess,
                    stats.success as f64,
                    Some(source.clone()),
                );
                emit(
                    MetricId::SourceFailed,
                    stats.failed as f64,
                    Some(source.clone()),
                );
                for (code, count) in &stats.by_code {
                    emit(
                        MetricId::SourceResultCode,
                        *count as f64,
                        Some(format!("{source}:{code}")),
                    );
                }
            }

            if let Some(cache) = &snapshot.extensions.cache {
                emit(MetricId::CacheHits, cache.hits as f64, None);
                emit(MetricId::CacheMisses, cache.misses as f64, None);
                emit(MetricId::CacheEvictions, cache.evictions as f64, None);
                emit(MetricId::CacheHitRate, cache.hit_rate, None);
                emit(MetricId::CacheSize, cache.size as f64, None);
            }

            if let Some(store) = &snapshot.extensions.store {
                emit(MetricId::StoreQueries, store.queries as f64, None);
                emit(MetricId::StoreInserts, store.inserts as f64, None);
                emit(MetricId::StoreUpdates, store.updates as f64, None);
                emit(MetricId::StoreDeletes, store.deletes as f64, None);
                emit(MetricId::StoreErrors, store.errors as f64, None);
                emit(
                    MetricId::StoreActiveQueries,
                    store.active_queries as f64,
                    None,
                );
            }
        }

        if !self.filter.is_empty() {
            records.retain(|record| self.filter.passes(record.metric));
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use statline_model::{CacheStats, SourceStats};
    use std::collections::HashMap;

    fn transformer() -> Transformer {
        Transformer::new("test-host", "test-system")
    }

    fn find(records: &[MetricRecord], id: MetricId) -> Vec<&MetricRecord> {
        records.iter().filter(|r| r.metric == id).collect()
    }

    #[test]
    fn zero_counter_emits_nothing() {
        let snapshot = Snapshot::default();
        let records = transformer().transform(&snapshot);
        assert!(find(&records, MetricId::RequestsTotal).is_empty());
        assert!(find(&records, MetricId::BytesSent).is_empty());
    }

    #[test]
    fn nonzero_counter_emits_exactly_one_record() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.total = 1;
        let records = transformer().transform(&snapshot);
        let total = find(&records, MetricId::RequestsTotal);
        assert_eq!(total.len(), 1);
        assert_eq!(total[0].value, 1.0);
        assert_eq!(total[0].dimension, None);
    }

    #[test]
    fn zero_gauge_still_emits() {
        // Zero active connections is state, not absence of data.
        let snapshot = Snapshot::default();
        let records = transformer().transform(&snapshot);
        let active = find(&records, MetricId::ConnectionsActive);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value, 0.0);
        assert_eq!(find(&records, MetricId::RequestsPending).len(), 1);
        assert_eq!(find(&records, MetricId::LatencyP99).len(), 1);
    }

    #[test]
    fn records_carry_identity_and_timestamp() {
        let mut snapshot = Snapshot::default();
        snapshot.timestamp = Utc::now();
        snapshot.requests.total = 5;
        let records = transformer().transform(&snapshot);
        let total = find(&records, MetricId::RequestsTotal)[0];
        assert_eq!(total.host, "test-host");
        assert_eq!(total.system, "test-system");
        assert_eq!(total.timestamp, snapshot.timestamp);
    }

    #[test]
    fn source_breakdown_uses_dimension_tags() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.by_source.insert(
            "http".to_string(),
            SourceStats {
                total: 40,
                success: 35,
                failed: 5,
                by_code: HashMap::from([(200, 35), (500, 5)]),
            },
        );

        let records = transformer().transform(&snapshot);

        let totals = find(&records, MetricId::SourceTotal);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].dimension.as_deref(), Some("http"));
        assert_eq!(totals[0].value, 40.0);

        let mut codes: Vec<(String, f64)> = find(&records, MetricId::SourceResultCode)
            .iter()
            .map(|r| (r.dimension.clone().unwrap(), r.value))
            .collect();
        codes.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            codes,
            vec![("http:200".to_string(), 35.0), ("http:500".to_string(), 5.0)]
        );
    }

    #[test]
    fn source_zero_counters_are_suppressed() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.by_source.insert(
            "http".to_string(),
            SourceStats {
                total: 10,
                success: 10,
                failed: 0,
                by_code: HashMap::new(),
            },
        );
        let records = transformer().transform(&snapshot);
        assert!(find(&records, MetricId::SourceFailed).is_empty());
    }

    #[test]
    fn absent_extensions_emit_nothing() {
        let snapshot = Snapshot::default();
        let records = transformer().transform(&snapshot);
        assert!(find(&records, MetricId::CacheHits).is_empty());
        // Even the extension's gauges: the slot itself is absent.
        assert!(find(&records, MetricId::CacheSize).is_empty());
        assert!(find(&records, MetricId::StoreActiveQueries).is_empty());
    }

    #[test]
    fn present_extension_emits_counters_and_gauges() {
        let mut snapshot = Snapshot::default();
        snapshot.extensions.cache = Some(CacheStats {
            hits: 40,
            misses: 0,
            evictions: 0,
            hit_rate: 0.0,
            size: 0,
        });
        let records = transformer().transform(&snapshot);
        assert_eq!(find(&records, MetricId::CacheHits)[0].value, 40.0);
        // Zero counters suppressed, zero gauges emitted.
        assert!(find(&records, MetricId::CacheMisses).is_empty());
        assert_eq!(find(&records, MetricId::CacheHitRate)[0].value, 0.0);
        assert_eq!(find(&records, MetricId::CacheSize)[0].value, 0.0);
    }

    #[test]
    fn include_list_restricts_output() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.total = 10;
        snapshot.requests.success = 9;
        snapshot.connections.active = 3;

        let transformer = transformer().with_filter(MetricFilter::new(
            [MetricId::RequestsTotal],
            [],
        ));
        let records = transformer.transform(&snapshot);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric, MetricId::RequestsTotal);
    }

    #[test]
    fn exclude_drops_id_everywhere() {
        // Excluding the result-code id removes every dimensioned record
        // that carries it, not just some of them.
        let mut snapshot = Snapshot::default();
        snapshot.requests.by_source.insert(
            "http".to_string(),
            SourceStats {
                total: 10,
                by_code: HashMap::from([(200, 5), (404, 5)]),
                ..Default::default()
            },
        );

        let transformer =
            transformer().with_filter(MetricFilter::new([], [MetricId::SourceResultCode]));
        let records = transformer.transform(&snapshot);
        assert!(find(&records, MetricId::SourceResultCode).is_empty());
        assert_eq!(find(&records, MetricId::SourceTotal).len(), 1);
    }

    #[test]
    fn exclude_wins_over_include() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.total = 10;
        snapshot.requests.success = 9;

        let transformer = transformer().with_filter(MetricFilter::new(
            [MetricId::RequestsTotal, MetricId::RequestsSuccess],
            [MetricId::RequestsTotal],
        ));
        let records = transformer.transform(&snapshot);
        assert!(find(&records, MetricId::RequestsTotal).is_empty());
        assert_eq!(find(&records, MetricId::RequestsSuccess).len(), 1);
    }

    #[test]
    fn transform_is_deterministic() {
        let mut snapshot = Snapshot::default();
        snapshot.requests.total = 10;
        snapshot.connections.active = 2;

        let transformer = transformer();
        let mut a = transformer.transform(&snapshot);
        let mut b = transformer.transform(&snapshot);
        a.sort_by_key(|r| u32::from(r.metric));
        b.sort_by_key(|r| u32::from(r.metric));
        assert_eq!(a, b);
    }
}
