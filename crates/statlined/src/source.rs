//! HTTP stats source — polls the host service's stats endpoint.
//!
//! GETs the configured URL once per cycle and decodes the JSON body
//! into a `Snapshot`. Any failure (connect, non-2xx, malformed body) is
//! a collector error: the scheduler logs it, skips the cycle, and keeps
//! its delta baseline untouched.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use http_body_util::BodyExt;

use statline_export::StatsSource;
use statline_model::Snapshot;

/// Collector that fetches snapshots from an HTTP stats endpoint.
pub struct HttpStatsSource {
    /// host:port for the TCP connect.
    address: String,
    /// Authority for the Host header.
    authority: String,
    path: String,
    timeout: Duration,
}

impl HttpStatsSource {
    /// Build a source for the given stats URL (http only).
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let uri: http::Uri = url.parse().with_context(|| format!("invalid stats url {url}"))?;
        if uri.scheme_str() != Some("http") {
            return Err(anyhow!("unsupported stats url scheme in {url}: only http is supported"));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| anyhow!("stats url {url} has no authority"))?;
        let address = format!(
            "{}:{}",
            authority.host(),
            authority.port_u16().unwrap_or(80)
        );
        let path = uri
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            address,
            authority: authority.to_string(),
            path,
            timeout,
        })
    }

    async fn fetch(&self) -> anyhow::Result<Snapshot> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("connect {}", self.address))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context("http handshake")?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let request = http::Request::builder()
            .method("GET")
            .uri(&self.path)
            .header("host", &self.authority)
            .header("accept", "application/json")
            .header("user-agent", "statline/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .context("build request")?;

        let response = sender.send_request(request).await.context("stats request")?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .context("read stats body")?
            .to_bytes();

        if !status.is_success() {
            return Err(anyhow!(
                "stats endpoint returned {status}: {}",
                String::from_utf8_lossy(&body)
            ));
        }

        serde_json::from_slice(&body).context("decode stats body")
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn collect(&self) -> anyhow::Result<Snapshot> {
        tokio::time::timeout(self.timeout, self.fetch())
            .await
            .map_err(|_| anyhow!("stats fetch timed out after {}ms", self.timeout.as_millis()))?
    }
}
