//! statlined — the statline export daemon.
//!
//! Assembles the pipeline from a TOML config file:
//! - HTTP stats source polling the host service
//! - transformer with the configured include/exclude filter
//! - one sink per enabled config entry (HTTP / Postgres / file)
//! - export scheduler driving the cycle loop
//!
//! # Usage
//!
//! ```text
//! statlined --config /etc/statline/statline.toml
//! ```

mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use statline_export::{ExportConfig, ExportScheduler, build_sink};
use statline_pipeline::{MetricFilter, Transformer};

use crate::source::HttpStatsSource;

#[derive(Parser)]
#[command(name = "statlined", about = "statline export daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "statline.toml")]
    config: PathBuf,
}

/// The daemon's configuration file: the export surface plus the stats
/// source to poll.
#[derive(Debug, Deserialize)]
struct DaemonConfig {
    #[serde(flatten)]
    export: ExportConfig,
    source: SourceConfig,
}

#[derive(Debug, Deserialize)]
struct SourceConfig {
    /// Stats endpoint of the host service.
    url: String,
    #[serde(default = "default_source_timeout_secs")]
    timeout_secs: u64,
}

fn default_source_timeout_secs() -> u64 {
    10
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,statline=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("read config {}", cli.config.display()))?;
    let config: DaemonConfig = toml::from_str(&raw)
        .with_context(|| format!("parse config {}", cli.config.display()))?;

    let host = if config.export.host.is_empty() {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string())
    } else {
        config.export.host.clone()
    };

    info!(
        service = %config.export.service,
        %host,
        interval_secs = config.export.interval_secs,
        "statlined starting"
    );

    // ── Assemble the pipeline ──────────────────────────────────

    let source = Arc::new(
        HttpStatsSource::new(
            &config.source.url,
            Duration::from_secs(config.source.timeout_secs),
        )
        .context("stats source")?,
    );
    info!(url = %config.source.url, "stats source configured");

    let filter = MetricFilter::new(
        config.export.filter.include.iter().copied(),
        config.export.filter.exclude.iter().copied(),
    );
    let transformer = Transformer::new(host, config.export.service.clone()).with_filter(filter);

    let scheduler = ExportScheduler::new(
        config.export.interval(),
        config.export.export_timeout(),
        source,
        transformer,
    );

    for sink_config in &config.export.sinks {
        if !sink_config.enabled() {
            info!(sink = sink_config.name(), "sink disabled, skipping");
            continue;
        }
        let sink = build_sink(sink_config)
            .await
            .with_context(|| format!("build sink {}", sink_config.name()))?;
        info!(sink = sink.name(), "sink registered");
        scheduler.add_sink(sink).await;
    }

    if scheduler.sink_names().await.is_empty() {
        warn!("no sinks configured; cycles will collect and drop metrics");
    }

    // ── Run until shutdown ─────────────────────────────────────

    scheduler.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;
    info!("shutdown signal received");

    scheduler.stop().await;
    info!("statlined stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_config_parses_export_surface_and_source() {
        let raw = r#"
            service = "gateway"
            interval_secs = 15

            [source]
            url = "http://127.0.0.1:9100/stats"

            [[sinks]]
            type = "file"
            name = "audit"
            path = "/var/log/statline/metrics.jsonl"
        "#;

        let config: DaemonConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.export.service, "gateway");
        assert_eq!(config.export.interval_secs, 15);
        assert_eq!(config.source.url, "http://127.0.0.1:9100/stats");
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.export.sinks.len(), 1);
    }

    #[test]
    fn missing_source_section_is_rejected() {
        assert!(toml::from_str::<DaemonConfig>(r#"service = "gateway""#).is_err());
    }
}
