//! Sink construction from configuration.
//!
//! When no retry is configured, each sink type gets a default suited to
//! its transport: backoff for HTTP, fixed delay for Postgres, a single
//! attempt for local file I/O. All three accept the same `RetryConfig`
//! to override.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RetryConfig, SinkConfig};
use crate::file::FileSink;
use crate::http::HttpSink;
use crate::postgres::PostgresSink;
use crate::sink::{RetryPolicy, Sink, SinkResult};

fn http_default_retry() -> RetryPolicy {
    RetryPolicy::backoff(3, Duration::from_secs(1), 2.0, Duration::from_secs(30))
}

fn postgres_default_retry() -> RetryPolicy {
    RetryPolicy::fixed(3, Duration::from_secs(1))
}

/// Construct one sink from its configuration entry. Invalid parameters
/// or an unreachable store are fatal here, not at export time.
pub async fn build_sink(config: &SinkConfig) -> SinkResult<Arc<dyn Sink>> {
    match config {
        SinkConfig::Http {
            name,
            url,
            headers,
            timeout_secs,
            retry,
            ..
        } => {
            let retry = retry
                .as_ref()
                .map(RetryConfig::policy)
                .unwrap_or_else(http_default_retry);
            let sink = HttpSink::new(
                name.clone(),
                url,
                headers.clone(),
                Duration::from_secs(*timeout_secs),
                retry,
            )?;
            Ok(Arc::new(sink))
        }
        SinkConfig::Postgres {
            name,
            connection_string,
            table,
            batch_size,
            retry,
            ..
        } => {
            let retry = retry
                .as_ref()
                .map(RetryConfig::policy)
                .unwrap_or_else(postgres_default_retry);
            let sink = PostgresSink::connect(
                name.clone(),
                connection_string,
                table.clone(),
                *batch_size,
                retry,
            )
            .await?;
            Ok(Arc::new(sink))
        }
        SinkConfig::File {
            name,
            path,
            max_size_bytes,
            max_backups,
            ..
        } => {
            let sink = FileSink::new(name.clone(), path.clone(), *max_size_bytes, *max_backups)?;
            Ok(Arc::new(sink))
        }
    }
}

/// Construct every enabled sink, skipping disabled entries.
pub async fn build_sinks(configs: &[SinkConfig]) -> SinkResult<Vec<Arc<dyn Sink>>> {
    let mut sinks = Vec::with_capacity(configs.len());
    for config in configs {
        if !config.enabled() {
            tracing::info!(sink = config.name(), "sink disabled, skipping");
            continue;
        }
        sinks.push(build_sink(config).await?);
    }
    Ok(sinks)
}
