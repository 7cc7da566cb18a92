//! Webhook sink: POSTs alerts as JSON to an HTTP endpoint.
//!
//! Uses a fresh hyper HTTP/1 connection per alert. Alerts are rare (at most
//! one per replacement pod per cycle), so there is no connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use tracing::debug;

use podsweep_core::NotificationMessage;

use crate::error::{NotifyError, NotifyResult};
use crate::sink::NotificationSink;

/// Default per-alert deadline, covering connect, request and response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WebhookSink {
    /// `host:port` to connect to.
    address: String,
    /// Host header value.
    authority: String,
    /// Origin-form request target (`/path?query`).
    target: String,
    timeout: Duration,
}

impl WebhookSink {
    /// Parse an `http://host[:port]/path` URL. `https` is not supported.
    pub fn new(url: &str) -> NotifyResult<Self> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e| NotifyError::InvalidUrl(format!("{url}: {e}")))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(NotifyError::InvalidUrl(format!(
                    "{url}: unsupported scheme {other}"
                )))
            }
            None => return Err(NotifyError::InvalidUrl(format!("{url}: missing scheme"))),
        }

        let authority = uri
            .authority()
            .ok_or_else(|| NotifyError::InvalidUrl(format!("{url}: missing host")))?;
        let port = authority.port_u16().unwrap_or(80);
        let address = format!("{}:{port}", authority.host());
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            address,
            authority: authority.as_str().to_string(),
            target,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn post(&self, body: Vec<u8>) -> NotifyResult<()> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| NotifyError::Transport(format!("connect {}: {e}", self.address)))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| NotifyError::Transport(format!("handshake: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("POST")
            .uri(self.target.as_str())
            .header("host", self.authority.as_str())
            .header("content-type", "application/json")
            .header("user-agent", "podsweep/0.1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| NotifyError::Transport(format!("build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| NotifyError::Transport(format!("request: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(resp.status().as_u16()))
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, msg: &NotificationMessage) -> NotifyResult<()> {
        let body = serde_json::to_vec(msg).map_err(|e| NotifyError::Encode(e.to_string()))?;

        match tokio::time::timeout(self.timeout, self.post(body)).await {
            Ok(result) => {
                if result.is_ok() {
                    debug!(
                        namespace = %msg.namespace,
                        pod = %msg.pod_name,
                        address = %self.address,
                        "webhook notification delivered"
                    );
                }
                result
            }
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn sample_message() -> NotificationMessage {
        NotificationMessage {
            namespace: "default".to_string(),
            pod_name: "a2".to_string(),
            phase: "Failed".to_string(),
            reason: "Error".to_string(),
            message: "exit code 1".to_string(),
        }
    }

    /// Read one HTTP/1 request (headers plus content-length body).
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// One-shot server answering with `status_line`; returns the request it saw.
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            request
        });
        (format!("http://{addr}/hooks/pods?team=infra"), handle)
    }

    #[test]
    fn parses_http_url() {
        let sink = WebhookSink::new("http://alerts.internal:9000/hook").unwrap();
        assert_eq!(sink.address, "alerts.internal:9000");
        assert_eq!(sink.authority, "alerts.internal:9000");
        assert_eq!(sink.target, "/hook");
        assert_eq!(sink.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn default_port_and_path() {
        let sink = WebhookSink::new("http://alerts.internal").unwrap();
        assert_eq!(sink.address, "alerts.internal:80");
        assert_eq!(sink.target, "/");
    }

    #[test]
    fn rejects_https_and_garbage() {
        assert!(matches!(
            WebhookSink::new("https://alerts.internal/hook"),
            Err(NotifyError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebhookSink::new("/just/a/path"),
            Err(NotifyError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebhookSink::new("http://exa mple.com"),
            Err(NotifyError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn posts_json_payload() {
        let (url, server) = serve_once("200 OK").await;
        let sink = WebhookSink::new(&url).unwrap();

        sink.send(&sample_message()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /hooks/pods?team=infra HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.contains(r#""podName":"a2""#));
        assert!(request.contains(r#""phase":"Failed""#));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let (url, server) = serve_once("500 Internal Server Error").await;
        let sink = WebhookSink::new(&url).unwrap();

        let err = sink.send(&sample_message()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(500)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = WebhookSink::new(&format!("http://{addr}/hook")).unwrap();
        let err = sink.send(&sample_message()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[tokio::test]
    async fn silent_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let sink = WebhookSink::new(&format!("http://{addr}/hook"))
            .unwrap()
            .with_timeout(Duration::from_millis(100));
        let err = sink.send(&sample_message()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Timeout(t) if t == Duration::from_millis(100)));
        server.abort();
    }
}
