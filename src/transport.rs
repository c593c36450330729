use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, Method};

/// Cap on response-body bytes echoed into logs.
const MAX_LOG_BODY_BYTES: usize = 2048;

/// The upstream serves browser traffic only, so every call carries a
/// browser-shaped header set instead of an API token.
const REFERER: &str = "https://deepwiki.com/";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// How a request failed, when it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Network-level failure: connect, DNS, timeout, truncated body.
    Client,
    /// The server answered with a status outside 2xx.
    Http,
    /// The transport was closed before this call.
    Closed,
}

/// Normalized result of one HTTP exchange. The orchestrator branches on
/// `ok`/`data` only and never sees a transport exception.
///
/// A 2xx response whose body is not JSON still yields `ok: true` with
/// `data: None`; callers must check for the fields they need rather than
/// trust transport success.
#[derive(Debug)]
pub struct Outcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<TransportFailure>,
    pub data: Option<serde_json::Value>,
}

impl Outcome {
    fn failure(error: TransportFailure, status: Option<u16>) -> Self {
        Self {
            ok: false,
            status,
            error: Some(error),
            data: None,
        }
    }

    fn success(status: u16, data: Option<serde_json::Value>) -> Self {
        Self {
            ok: true,
            status: Some(status),
            error: None,
            data,
        }
    }
}

/// Long-lived HTTP handle shared by every query for connection reuse.
/// Explicitly closed once at shutdown; calls after close fail with
/// [`TransportFailure::Closed`] instead of silently succeeding.
pub struct Transport {
    client: Client,
    closed: AtomicBool,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Mark the handle released. Idempotent; in-flight requests finish, new
    /// ones fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Perform one request and normalize every outcome. Never returns `Err`
    /// in any shape; retry policy lives entirely in the caller.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Outcome {
        if self.is_closed() {
            tracing::error!(url, "request on closed transport");
            return Outcome::failure(TransportFailure::Closed, None);
        }

        let mut req = self
            .client
            .request(method, url)
            .header("accept", "*/*")
            .header("content-type", "application/json")
            .header("origin", REFERER)
            .header("referer", REFERER)
            .header("user-agent", USER_AGENT);

        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(url, "request failed: {e}");
                return Outcome::failure(TransportFailure::Client, None);
            }
        };

        let status = resp.status();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(url, status = status.as_u16(), "body read failed: {e}");
                return Outcome::failure(TransportFailure::Client, Some(status.as_u16()));
            }
        };

        if !status.is_success() {
            let truncated = &bytes[..bytes.len().min(MAX_LOG_BODY_BYTES)];
            tracing::error!(
                url,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(truncated),
                "non-success status"
            );
            return Outcome::failure(TransportFailure::Http, Some(status.as_u16()));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Outcome::success(status.as_u16(), Some(value)),
            Err(e) => {
                // Leniency: a 2xx with a non-JSON body is still transport
                // success, just with nothing usable in it.
                let truncated = &bytes[..bytes.len().min(MAX_LOG_BODY_BYTES)];
                tracing::debug!(
                    url,
                    status = status.as_u16(),
                    snippet = %String::from_utf8_lossy(truncated),
                    "2xx body is not JSON: {e}"
                );
                Outcome::success(status.as_u16(), None)
            }
        }
    }
}
