//! The sink contract, its error type, and the shared retry policy.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use statline_model::{MetricRecord, Snapshot};

/// Result type alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors a sink can surface to the scheduler.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<SinkError> },

    #[error("invalid sink configuration: {0}")]
    Config(String),
}

/// A destination for metric record batches.
///
/// Implementations own their transport, retry policy, and any private
/// resources (connection pool, file handle); nothing is shared across
/// sinks. From the scheduler's point of view `export` is atomic in
/// outcome: the whole batch lands, or one aggregated failure comes back.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Push one cycle's record batch. An empty batch is a no-op success.
    async fn export(&self, records: &[MetricRecord]) -> SinkResult<()>;

    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Release transport resources. Called once at scheduler shutdown;
    /// must be safe even if no export ever ran.
    async fn close(&self) -> SinkResult<()>;
}

/// Supplies the current statistics snapshot, once per export cycle.
///
/// Owned by the host service. Must return promptly — the cycle's export
/// timeout is the only backstop against a stuck collector.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn collect(&self) -> anyhow::Result<Snapshot>;
}

/// Bounded retry with fixed or exponentially growing delays.
///
/// `multiplier == 1.0` gives a fixed delay between attempts; a larger
/// multiplier grows the delay geometrically, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Growth factor applied per subsequent failure.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Exponential backoff capped at `max_delay`.
    pub fn backoff(
        max_attempts: u32,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
            max_delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay to sleep after the given failed attempt (1-based). No
    /// delay is taken after the final attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::backoff(3, Duration::from_secs(1), 2.0, Duration::from_secs(30))
    }
}
