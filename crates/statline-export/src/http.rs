//! HTTP sink — POSTs each cycle's batch as one JSON array.
//!
//! Plain http/1.1 over TCP: connect, handshake, drive the connection in
//! a background task, send the request. Retries transient failures per
//! its own `RetryPolicy`; a non-2xx response is a failure carrying the
//! status and body.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::BodyExt;
use tracing::{debug, warn};

use statline_model::MetricRecord;

use crate::sink::{RetryPolicy, Sink, SinkError, SinkResult};

/// Sink that POSTs record batches to an HTTP collector endpoint.
pub struct HttpSink {
    name: String,
    /// host:port for the TCP connect.
    address: String,
    /// Authority for the Host header.
    authority: String,
    /// Path and query of the collector endpoint.
    path: String,
    headers: HashMap<String, String>,
    /// Bound on a single request attempt.
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl HttpSink {
    /// Build a sink for the given collector URL. Only `http` URLs are
    /// accepted; a malformed URL is fatal at construction.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        headers: HashMap<String, String>,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> SinkResult<Self> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e| SinkError::Config(format!("invalid url {url}: {e}")))?;
        if uri.scheme_str() != Some("http") {
            return Err(SinkError::Config(format!(
                "unsupported url scheme in {url}: only http is supported"
            )));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| SinkError::Config(format!("url {url} has no authority")))?;
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
            name: name.into(),
            address,
            authority: authority.to_string(),
            path,
            headers,
            request_timeout,
            retry,
        })
    }

    /// One POST attempt over a fresh connection.
    async fn send(&self, payload: bytes::Bytes) -> SinkResult<()> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| SinkError::Transport(format!("connect {}: {e}", self.address)))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SinkError::Transport(format!("handshake: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = http::Request::builder()
            .method("POST")
            .uri(&self.path)
            .header("host", &self.authority)
            .header("content-type", "application/json")
            .header("user-agent", "statline/0.1");
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let request = builder
            .body(http_body_util::Full::new(payload))
            .map_err(|e| SinkError::Transport(format!("build request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| SinkError::Transport(format!("request: {e}")))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();

        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn export(&self, records: &[MetricRecord]) -> SinkResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let payload = bytes::Bytes::from(serde_json::to_vec(records)?);
        let attempts = self.retry.max_attempts.max(1);
        let mut last: Option<SinkError> = None;

        for attempt in 1..=attempts {
            let result = tokio::time::timeout(self.request_timeout, self.send(payload.clone()))
                .await
                .unwrap_or_else(|_| {
                    Err(SinkError::Transport(format!(
                        "request timed out after {}ms",
                        self.request_timeout.as_millis()
                    )))
                });

            match result {
                Ok(()) => {
                    debug!(
                        sink = %self.name,
                        records = records.len(),
                        attempt,
                        "exported metrics over HTTP"
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        sink = %self.name,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "HTTP export attempt failed"
                    );
                    last = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(SinkError::RetriesExhausted {
            attempts,
            last: Box::new(
                last.unwrap_or_else(|| SinkError::Transport("no attempts made".to_string())),
            ),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Connections are per-request; nothing to release.
    async fn close(&self) -> SinkResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use statline_model::MetricId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record() -> MetricRecord {
        MetricRecord {
            metric: MetricId::RequestsTotal,
            value: 50.0,
            dimension: None,
            host: "node-1".to_string(),
            system: "gateway".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn sink(url: &str, retry: RetryPolicy) -> HttpSink {
        HttpSink::new("test", url, HashMap::new(), Duration::from_secs(1), retry).unwrap()
    }

    /// Accept `count` requests, answering each with `status`, and return
    /// the bound address plus the raw request heads received.
    async fn serve(
        status: &'static str,
        count: usize,
    ) -> (String, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            for _ in 0..count {
                let (mut socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let tx = tx.clone();
                let mut buf = Vec::new();
                // Read until the headers (and small JSON body) are in.
                loop {
                    let mut chunk = [0u8; 4096];
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf);
                    if let Some(header_end) = text.find("\r\n\r\n") {
                        let content_length = text
                            .lines()
                            .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                            .unwrap_or(0);
                        if buf.len() >= header_end + 4 + content_length {
                            break;
                        }
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (address, rx)
    }

    #[tokio::test]
    async fn posts_json_array_to_endpoint() {
        let (address, mut requests) = serve("200 OK", 1).await;
        let sink = sink(&format!("http://{address}/metrics"), RetryPolicy::none());

        sink.export(&[record()]).await.unwrap();

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /metrics HTTP/1.1"));
        assert!(request.contains("content-type: application/json"));
        assert!(request.contains(r#""counter_id":1000"#));
    }

    #[tokio::test]
    async fn custom_headers_are_sent() {
        let (address, mut requests) = serve("200 OK", 1).await;
        let headers = HashMap::from([(
            "authorization".to_string(),
            "Bearer token".to_string(),
        )]);
        let sink = HttpSink::new(
            "test",
            &format!("http://{address}/metrics"),
            headers,
            Duration::from_secs(1),
            RetryPolicy::none(),
        )
        .unwrap();

        sink.export(&[record()]).await.unwrap();

        let request = requests.recv().await.unwrap();
        assert!(request.contains("authorization: Bearer token"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        // No server at all: an empty batch must not touch the network.
        let sink = sink("http://127.0.0.1:1/metrics", RetryPolicy::none());
        sink.export(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn non_2xx_exhausts_retries() {
        let (address, _requests) = serve("500 Internal Server Error", 2).await;
        let sink = sink(
            &format!("http://{address}/metrics"),
            RetryPolicy::fixed(2, Duration::from_millis(1)),
        );

        let err = sink.export(&[record()]).await.unwrap_err();
        match err {
            SinkError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, SinkError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let sink = sink("http://127.0.0.1:1/metrics", RetryPolicy::none());
        let err = sink.export(&[record()]).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::RetriesExhausted { .. } | SinkError::Transport(_)
        ));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(
            HttpSink::new(
                "test",
                "not a url",
                HashMap::new(),
                Duration::from_secs(1),
                RetryPolicy::none()
            ),
            Err(SinkError::Config(_))
        ));
        assert!(matches!(
            HttpSink::new(
                "test",
                "https://collector:8443/metrics",
                HashMap::new(),
                Duration::from_secs(1),
                RetryPolicy::none()
            ),
            Err(SinkError::Config(_))
        ));
    }

    #[test]
    fn default_port_is_80() {
        let sink = sink("http://collector/metrics", RetryPolicy::none());
        assert_eq!(sink.address, "collector:80");
        assert_eq!(sink.path, "/metrics");
    }
}
