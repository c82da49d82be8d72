//! Error Types
//!
//! Error hierarchy shared by the transport, the error classification pipeline
//! and the OAuth token engine.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::{HttpRequest, HttpResponse};

/// Root error type.
#[derive(Error, Debug)]
pub enum RestError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    Call(Box<CallError>),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),
}

impl From<CallError> for RestError {
    fn from(error: CallError) -> Self {
        Self::Call(Box::new(error))
    }
}

impl RestError {
    /// HTTP status of the exchange that raised this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Call(e) => Some(e.status()),
            _ => None,
        }
    }
}

/// Error raised by the error classification pipeline for one HTTP exchange.
///
/// The client only recovers two cases before raising it: a not-authenticated
/// status on an oauth2 call (two extra attempts) and a redirect within the hop
/// budget. Every other call error is terminal.
#[derive(Error, Debug, Clone)]
#[error("{}", .messages.join("\n"))]
pub struct CallError {
    /// Request as it was sent.
    pub request: HttpRequest,
    /// Response as it was received (body empty for streamed downloads).
    pub response: HttpResponse,
    /// Messages contributed by the pipeline handlers, in evaluation order.
    pub messages: Vec<String>,
}

impl CallError {
    pub fn new(request: HttpRequest, response: HttpResponse, messages: Vec<String>) -> Self {
        Self {
            request,
            response,
            messages,
        }
    }

    /// HTTP status code of the response.
    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// Joined message text.
    pub fn message(&self) -> String {
        self.messages.join("\n")
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid private key: {message}")]
    InvalidKey { message: String },

    #[error("Unsupported redirect URI: {uri}")]
    UnsupportedRedirect { uri: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Invalid HTTP method: {method}")]
    InvalidMethod { method: String },
}

/// Network/transport error. Propagated immediately, never retried.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Option<Duration> },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Failed to read response body: {message}")]
    BodyRead { message: String },

    #[error("Failed to create HTTP client: {message}")]
    ClientBuild { message: String },

    #[error("Callback listener failed: {message}")]
    Listener { message: String },
}

/// Protocol/contract error. Never retried.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Missing expected field in token response: {field}")]
    MissingField { field: String },

    #[error("Redirect response {status} has no Location header")]
    MissingLocation { status: u16 },

    #[error("Too many redirects (limit {max})")]
    TooManyRedirects { max: u32 },

    #[error("Unknown grant type: {grant}")]
    UnknownGrant { grant: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("State parameter mismatch (possible CSRF attack)")]
    StateMismatch { expected: String, received: String },

    #[error("Authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        error_description: Option<String>,
    },

    #[error("Authorization callback carries no code")]
    MissingCode,
}

/// Token cache error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Streamed download error.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download stream interrupted: {message}")]
    Interrupted { message: String },
}

/// Result type for transport and token operations.
pub type RestResult<T> = Result<T, RestError>;
