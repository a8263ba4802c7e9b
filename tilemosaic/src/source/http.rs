//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("tilemosaic/", env!("CARGO_PKG_VERSION"));

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Value of the Content-Type header, if present
    pub content_type: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level HTTP failures (no usable response was received).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The request did not complete in time
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other request or body-read failure
    #[error("request failed: {0}")]
    Request(String),

    /// The client itself could not be built
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// Trait for asynchronous HTTP GET requests.
///
/// Non-success statuses are returned as responses, not errors, so callers
/// can classify them.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with the given overall request timeout.
    ///
    /// Connections are pooled and kept alive since tile fetches hit the
    /// same host in bursts.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(64)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else if e.is_connect() {
                    HttpError::Connect(e.to_string())
                } else {
                    HttpError::Request(e.to_string())
                });
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(e.to_string())
            } else {
                HttpError::Request(format!("Failed to read response: {}", e))
            }
        })?;

        Ok(HttpResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Mock HTTP client replaying scripted responses in order.
    ///
    /// Once the script is exhausted the last entry repeats.
    pub struct MockAsyncHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        last: Mutex<Option<Result<HttpResponse, HttpError>>>,
        pub urls: Mutex<Vec<String>>,
    }

    impl MockAsyncHttpClient {
        pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(body: Vec<u8>, content_type: &str) -> Self {
            Self::new(vec![Ok(HttpResponse {
                status: 200,
                content_type: Some(content_type.to_string()),
                body,
            })])
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
            self.urls.lock().push(url.to_string());
            let next = self.responses.lock().pop_front();
            match next {
                Some(r) => {
                    *self.last.lock() = Some(r.clone());
                    r
                }
                None => self
                    .last
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Err(HttpError::Request("no scripted response".into()))),
            }
        }
    }

    #[test]
    fn test_response_success_range() {
        let mut r = HttpResponse {
            status: 200,
            content_type: None,
            body: vec![],
        };
        assert!(r.is_success());
        r.status = 304;
        assert!(!r.is_success());
        r.status = 503;
        assert!(!r.is_success());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(AsyncReqwestClient::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_mock_repeats_last_response() {
        let mock = MockAsyncHttpClient::new(vec![Err(HttpError::Timeout("slow".into()))]);
        assert!(mock.get("http://a").await.is_err());
        assert!(mock.get("http://b").await.is_err());
        assert_eq!(mock.urls.lock().len(), 2);
    }
}
