//! Callback Listener
//!
//! Minimal local HTTP endpoint receiving the web-grant redirect.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;
use url::Url;

use crate::error::{ConfigurationError, NetworkError, RestError, RestResult};
use crate::types::CallbackParams;

const SUCCESS_PAGE: &str = "<html><body><p>Authentication complete. You may close this window.</p></body></html>";

/// Callback hook run once the listener is accepting connections.
pub type ReadyCallback<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Local callback listener interface (for dependency injection).
#[async_trait]
pub trait CallbackListener: Send + Sync {
    /// Bind to the redirect URI, run `ready`, and wait for exactly one
    /// request on the redirect path.
    async fn capture(
        &self,
        redirect_uri: &Url,
        ready: ReadyCallback<'_>,
    ) -> RestResult<CallbackParams>;
}

/// Listener backed by a tokio `TcpListener`. Plain `http` redirect URIs only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalCallbackListener;

#[async_trait]
impl CallbackListener for LocalCallbackListener {
    async fn capture(
        &self,
        redirect_uri: &Url,
        ready: ReadyCallback<'_>,
    ) -> RestResult<CallbackParams> {
        if redirect_uri.scheme() != "http" {
            return Err(RestError::Configuration(
                ConfigurationError::UnsupportedRedirect {
                    uri: redirect_uri.to_string(),
                },
            ));
        }
        let host = redirect_uri.host_str().ok_or_else(|| {
            RestError::Configuration(ConfigurationError::UnsupportedRedirect {
                uri: redirect_uri.to_string(),
            })
        })?;
        let port = redirect_uri.port_or_known_default().unwrap_or(80);
        let address = format!("{}:{}", host, port);

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| listener_error(format!("bind {}: {}", address, e)))?;
        debug!(address = %address, path = redirect_uri.path(), "Callback listener ready");

        ready();

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| listener_error(format!("accept: {}", e)))?;

            if let Some(params) = handle_connection(stream, redirect_uri).await? {
                return Ok(params);
            }
        }
    }
}

/// Serve one connection. `None` when the request was not for the redirect path.
async fn handle_connection(
    stream: TcpStream,
    redirect_uri: &Url,
) -> RestResult<Option<CallbackParams>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(|e| listener_error(format!("read: {}", e)))?;

    // Drain the header block.
    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| listener_error(format!("read: {}", e)))?;
        if read == 0 || line.trim_end().is_empty() {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let received = redirect_uri
        .join(target)
        .map_err(|e| listener_error(format!("bad request target {}: {}", target, e)))?;

    let mut stream = reader.into_inner();
    if received.path() != redirect_uri.path() {
        debug!(path = received.path(), "Ignoring request outside callback path");
        write_response(&mut stream, "404 Not Found", "Not Found").await?;
        return Ok(None);
    }

    write_response(&mut stream, "200 OK", SUCCESS_PAGE).await?;
    Ok(Some(CallbackParams::from_url(&received)))
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> RestResult<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| listener_error(format!("write: {}", e)))?;
    let _ = stream.shutdown().await;
    Ok(())
}

fn listener_error(message: String) -> RestError {
    RestError::Network(NetworkError::Listener { message })
}

/// Mock callback listener for testing.
#[derive(Default)]
pub struct MockCallbackListener {
    next_params: Mutex<Option<CallbackParams>>,
    history: Mutex<Vec<Url>>,
}

impl MockCallbackListener {
    /// Create new mock listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback parameters the next capture returns.
    pub fn set_next_params(&self, params: CallbackParams) -> &Self {
        *lock(&self.next_params) = Some(params);
        self
    }

    /// Redirect URIs captured so far.
    pub fn get_history(&self) -> Vec<Url> {
        lock(&self.history).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl CallbackListener for MockCallbackListener {
    async fn capture(
        &self,
        redirect_uri: &Url,
        ready: ReadyCallback<'_>,
    ) -> RestResult<CallbackParams> {
        lock(&self.history).push(redirect_uri.clone());
        ready();
        lock(&self.next_params)
            .take()
            .ok_or_else(|| listener_error("no mock callback configured".to_string()))
    }
}
