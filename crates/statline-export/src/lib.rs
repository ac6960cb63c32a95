//! statline-export — the export scheduler and its sinks.
//!
//! # Architecture
//!
//! ```text
//! ExportScheduler
//!   ├── run() → periodic cycle loop (one background task)
//!   │     collect → delta → transform → fan-out
//!   ├── add_sink() ← register destinations, also while running
//!   └── stop() → drain in-flight cycle, close every sink once
//!
//! Sink (trait)
//!   ├── HttpSink      → POST a JSON array per cycle
//!   ├── PostgresSink  → chunked multi-row INSERTs
//!   └── FileSink      → JSONL with size-based rotation
//! ```
//!
//! Each sink owns its retry policy and private resources; the scheduler
//! isolates every export call behind its own task and timeout, so one
//! sink failing or hanging never touches its siblings.

pub mod config;
pub mod file;
pub mod http;
pub mod postgres;
pub mod registry;
pub mod scheduler;
pub mod sink;

pub use config::{ExportConfig, FilterConfig, RetryConfig, SinkConfig};
pub use file::FileSink;
pub use http::HttpSink;
pub use postgres::PostgresSink;
pub use registry::{build_sink, build_sinks};
pub use scheduler::ExportScheduler;
pub use sink::{RetryPolicy, Sink, SinkError, SinkResult, StatsSource};
