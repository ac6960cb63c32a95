//! statline-pipeline — pure computation between snapshot and records.
//!
//! Two stages, both free of I/O and state:
//!
//! ```text
//! delta::between(prev, curr)   counters subtract (saturating),
//!                              gauges pass through
//!          │
//!          ▼
//! Transformer::transform(..)   flatten to MetricRecords with
//!                              zero-suppression and id filtering
//! ```

pub mod delta;
pub mod transform;

pub use transform::{MetricFilter, Transformer};
