//! HTTP Transport
//!
//! Low-level HTTP exchange interface and implementations. Redirects are never
//! followed here; the [`RestClient`](crate::client::RestClient) owns that policy.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use crate::error::{ConfigurationError, NetworkError, RestError, RestResult};
use crate::types::TransportConfig;

/// Streamed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = RestResult<Bytes>> + Send>>;

/// HTTP request definition.
#[derive(Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute request URL, query included.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Encoded request body.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: HashMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "[REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body.as_ref().map(|b| b.len()))
            .finish()
    }
}

/// HTTP method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Non-standard verb, e.g. `CANCEL`.
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Custom(verb) => verb,
        }
    }
}

impl TryFrom<&HttpMethod> for reqwest::Method {
    type Error = RestError;

    fn try_from(method: &HttpMethod) -> Result<Self, Self::Error> {
        reqwest::Method::from_bytes(method.as_str().as_bytes()).map_err(|_| {
            RestError::Configuration(ConfigurationError::InvalidMethod {
                method: method.as_str().to_string(),
            })
        })
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// Response body. Empty when the body was streamed elsewhere.
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Header lookup; names are stored lowercased.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Media type without parameters, e.g. `application/json`.
    pub fn media_type(&self) -> Option<mime::Mime> {
        self.header("content-type")?.parse::<mime::Mime>().ok()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request and read the whole body.
    async fn send(&self, request: HttpRequest) -> RestResult<HttpResponse>;

    /// Send an HTTP request and hand back the body as a stream.
    async fn send_streaming(&self, request: HttpRequest)
        -> RestResult<(HttpResponse, ByteStream)>;

    /// Independent transport (own connection) for another origin.
    fn fork(&self) -> Arc<dyn HttpTransport>;
}

/// Default reqwest-based HTTP transport.
///
/// The underlying client is created on first use and reused for every
/// following exchange (keep-alive).
pub struct ReqwestHttpTransport {
    config: Arc<TransportConfig>,
    client: OnceCell<reqwest::Client>,
}

impl ReqwestHttpTransport {
    /// Create new transport. No connection is made until the first request.
    pub fn new(config: Arc<TransportConfig>) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> RestResult<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async { build_client(&self.config) })
            .await
    }

    async fn dispatch(&self, request: HttpRequest) -> RestResult<reqwest::Response> {
        let client = self.client().await?;
        let method = reqwest::Method::try_from(&request.method)?;

        let mut req_builder = client.request(method, &request.url);
        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }
        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RestError::Network(NetworkError::Timeout {
                    timeout: self.config.timeout,
                })
            } else if e.is_connect() {
                RestError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            } else {
                RestError::Network(NetworkError::RequestFailed {
                    message: e.to_string(),
                })
            }
        })
    }
}

fn build_client(config: &TransportConfig) -> RestResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .danger_accept_invalid_certs(!config.verify_tls);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(hook) = &config.session_hook {
        builder = hook(builder);
    }

    builder.build().map_err(|e| {
        RestError::Network(NetworkError::ClientBuild {
            message: e.to_string(),
        })
    })
}

fn response_head(response: &reqwest::Response) -> HttpResponse {
    let mut headers = HashMap::new();
    for (key, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(key.as_str().to_lowercase(), v.to_string());
        }
    }

    HttpResponse {
        status: response.status().as_u16(),
        status_text: response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string(),
        headers,
        body: Bytes::new(),
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> RestResult<HttpResponse> {
        let response = self.dispatch(request).await?;
        let mut head = response_head(&response);

        head.body = response.bytes().await.map_err(|e| {
            RestError::Network(NetworkError::BodyRead {
                message: e.to_string(),
            })
        })?;

        Ok(head)
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> RestResult<(HttpResponse, ByteStream)> {
        let response = self.dispatch(request).await?;
        let head = response_head(&response);

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                RestError::Network(NetworkError::BodyRead {
                    message: e.to_string(),
                })
            })
        });

        Ok((head, Box::pin(stream)))
    }

    fn fork(&self) -> Arc<dyn HttpTransport> {
        Arc::new(Self::new(self.config.clone()))
    }
}

#[derive(Default)]
struct MockState {
    responses: Mutex<VecDeque<HttpResponse>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
    forks: Mutex<usize>,
}

/// Mock HTTP transport for testing.
///
/// Responses are served in the order they were queued. Clones and forks share
/// the same queue and history.
#[derive(Clone, Default)]
pub struct MockHttpTransport {
    state: Arc<MockState>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        lock(&self.state.responses).push_back(response);
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.queue_response(HttpResponse {
            status,
            status_text: reason_phrase(status),
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: Bytes::from(body.to_string()),
        })
    }

    /// Queue a redirect to `location`.
    pub fn queue_redirect(&self, status: u16, location: &str) -> &Self {
        self.queue_response(HttpResponse {
            status,
            status_text: reason_phrase(status),
            headers: [("location".to_string(), location.to_string())]
                .into_iter()
                .collect(),
            body: Bytes::new(),
        })
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *lock(&self.state.default_response) = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.state.request_history).clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        lock(&self.state.request_history).last().cloned()
    }

    /// Number of times [`HttpTransport::fork`] was called.
    pub fn fork_count(&self) -> usize {
        *lock(&self.state.forks)
    }

    fn next_response(&self, request: HttpRequest) -> RestResult<HttpResponse> {
        lock(&self.state.request_history).push(request);

        lock(&self.state.responses)
            .pop_front()
            .or_else(|| lock(&self.state.default_response).clone())
            .ok_or_else(|| {
                RestError::Network(NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                })
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> RestResult<HttpResponse> {
        self.next_response(request)
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> RestResult<(HttpResponse, ByteStream)> {
        let mut response = self.next_response(request)?;
        let body = std::mem::take(&mut response.body);
        let stream: ByteStream = Box::pin(stream::iter(vec![Ok(body)]));
        Ok((response, stream))
    }

    fn fork(&self) -> Arc<dyn HttpTransport> {
        *lock(&self.state.forks) += 1;
        Arc::new(self.clone())
    }
}
