//! statline-model — the normalized statistics data model.
//!
//! Pure data, no I/O: the `Snapshot` a collector hands to the pipeline
//! each cycle, the closed `MetricId` table with its counter/gauge
//! classification, and the flat `MetricRecord` that sinks consume.

pub mod metric;
pub mod record;
pub mod snapshot;

pub use metric::{MetricId, MetricKind, MetricMeta};
pub use record::MetricRecord;
pub use snapshot::{
    CacheStats, ConnectionStats, Extensions, PerformanceStats, RequestStats, Snapshot,
    SourceStats, StoreStats,
};
