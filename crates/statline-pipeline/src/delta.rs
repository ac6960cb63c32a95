//! Delta engine — the change between two consecutive snapshots.
//!
//! Counters are differenced with saturating subtraction: a counter reset
//! (process restart) floors at zero instead of wrapping into a huge
//! unsigned value. Gauges carry the current value verbatim. Dimension
//! keys are driven by the current snapshot — new keys diff against zero,
//! vanished keys drop out.

use std::collections::HashMap;

use statline_model::{
    CacheStats, ConnectionStats, Extensions, RequestStats, Snapshot, SourceStats, StoreStats,
};

/// Compute the delta snapshot between `prev` and `curr`.
///
/// With no previous snapshot there is nothing to subtract from, so the
/// delta *is* the current snapshot. Inputs are never mutated.
pub fn between(prev: Option<&Snapshot>, curr: &Snapshot) -> Snapshot {
    let Some(prev) = prev else {
        return curr.clone();
    };

    Snapshot {
        service: curr.service.clone(),
        timestamp: curr.timestamp,
        connections: ConnectionStats {
            total: curr.connections.total.saturating_sub(prev.connections.total),
            // Gauge: current value, never differenced.
            active: curr.connections.active,
            failed: curr.connections.failed.saturating_sub(prev.connections.failed),
            closed: curr.connections.closed.saturating_sub(prev.connections.closed),
        },
        requests: RequestStats {
            total: curr.requests.total.saturating_sub(prev.requests.total),
            success: curr.requests.success.saturating_sub(prev.requests.success),
            failed: curr.requests.failed.saturating_sub(prev.requests.failed),
            // Gauge.
            pending: curr.requests.pending,
            bytes_sent: curr
                .requests
                .bytes_sent
                .saturating_sub(prev.requests.bytes_sent),
            bytes_received: curr
                .requests
                .bytes_received
                .saturating_sub(prev.requests.bytes_received),
            by_source: source_delta(&curr.requests.by_source, &prev.requests.by_source),
        },
        // Every performance field is a gauge.
        performance: curr.performance,
        extensions: Extensions {
            cache: curr
                .extensions
                .cache
                .as_ref()
                .map(|c| cache_delta(c, prev.extensions.cache.as_ref())),
            store: curr
                .extensions
                .store
                .as_ref()
                .map(|s| store_delta(s, prev.extensions.store.as_ref())),
        },
    }
}

/// Per-source delta. Keys present only in `prev` are dropped; a key new
/// in `curr` diffs against an all-zero previous entry.
fn source_delta(
    curr: &HashMap<String, SourceStats>,
    prev: &HashMap<String, SourceStats>,
) -> HashMap<String, SourceStats> {
    curr.iter()
        .map(|(source, c)| {
            let p = prev.get(source).cloned().unwrap_or_default();
            let delta = SourceStats {
                total: c.total.saturating_sub(p.total),
                success: c.success.saturating_sub(p.success),
                failed: c.failed.saturating_sub(p.failed),
                by_code: code_delta(&c.by_code, &p.by_code),
            };
            (source.clone(), delta)
        })
        .collect()
}

/// Per-code saturating delta; entries whose delta is zero are dropped.
fn code_delta(curr: &HashMap<u16, u64>, prev: &HashMap<u16, u64>) -> HashMap<u16, u64> {
    curr.iter()
        .filter_map(|(code, count)| {
            let before = prev.get(code).copied().unwrap_or(0);
            let diff = count.saturating_sub(before);
            (diff > 0).then_some((*code, diff))
        })
        .collect()
}

/// Cache extension delta. A slot absent previously diffs against zero.
fn cache_delta(curr: &CacheStats, prev: Option<&CacheStats>) -> CacheStats {
    let p = prev.copied().unwrap_or_default();
    CacheStats {
        hits: curr.hits.saturating_sub(p.hits),
        misses: curr.misses.saturating_sub(p.misses),
        evictions: curr.evictions.saturating_sub(p.evictions),
        // Gauges.
        hit_rate: curr.hit_rate,
        size: curr.size,
    }
}

/// Store extension delta.
fn store_delta(curr: &StoreStats, prev: Option<&StoreStats>) -> StoreStats {
    let p = prev.copied().unwrap_or_default();
    StoreStats {
        queries: curr.queries.saturating_sub(p.queries),
        inserts: curr.inserts.saturating_sub(p.inserts),
        updates: curr.updates.saturating_sub(p.updates),
        deletes: curr.deletes.saturating_sub(p.deletes),
        errors: curr.errors.saturating_sub(p.errors),
        // Gauge.
        active_queries: curr.active_queries,
    }
}
