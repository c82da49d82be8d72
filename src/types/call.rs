//! Call Types
//!
//! Call descriptors and call results.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::{HttpMethod, HttpResponse};
use crate::error::{ProtocolError, RestError, RestResult};
use crate::types::AuthConfig;

/// Query parameter value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    /// Rendered as `key=a&key=b`.
    List(Vec<String>),
    /// Rendered as `key[]=a&key[]=b`.
    BracketList(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

/// Request body. At most one per call.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
}

impl RequestBody {
    /// `Content-Type` header value for this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::Form(_) => "application/x-www-form-urlencoded",
            Self::Text(_) => "text/plain",
        }
    }

    /// Encoded body text.
    pub fn encode(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Description of one logical HTTP call.
///
/// Fields left unset fall back to the [`RestClient`](crate::client::RestClient)
/// defaults.
#[derive(Clone, Debug, Default)]
pub struct CallDescriptor {
    pub method: HttpMethod,
    /// Overrides the client base URL.
    pub base_url: Option<String>,
    pub subpath: String,
    pub headers: HashMap<String, String>,
    pub body: Option<RequestBody>,
    pub query: Vec<(String, QueryValue)>,
    /// Overrides the client auth.
    pub auth: Option<AuthConfig>,
    /// Stream a 2xx body into this file.
    pub download: Option<PathBuf>,
    /// Return the result instead of raising a call error.
    pub return_errors: bool,
    /// Redirect hops to follow. Zero means a 3xx is reported as a call error.
    pub max_redirects: u32,
}

impl CallDescriptor {
    pub fn new(method: HttpMethod, subpath: impl Into<String>) -> Self {
        Self {
            method,
            subpath: subpath.into(),
            ..Default::default()
        }
    }

    /// Set a header, replacing any existing one with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form_body<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Some(RequestBody::Form(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn download_to(mut self, target: impl Into<PathBuf>) -> Self {
        self.download = Some(target.into());
        self
    }

    pub fn return_errors(mut self, return_errors: bool) -> Self {
        self.return_errors = return_errors;
        self
    }

    /// Redirect hop budget for the whole call.
    ///
    /// A redirect to another origin reissues the call through a fresh client
    /// with the hops still left. Credentials are not carried across origins:
    /// the `Authorization` header and the auth config are dropped.
    pub fn max_redirects(mut self, hops: u32) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Decoded response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
    /// No body, a streamed download, or JSON that failed to parse.
    #[default]
    Empty,
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Outcome of [`RestClient::call`](crate::client::RestClient::call).
#[derive(Clone, Debug)]
pub struct CallResult {
    pub response: HttpResponse,
    pub data: ResponseData,
    /// Pipeline messages; non-empty only when errors were returned.
    pub messages: Vec<String>,
    /// Downloaded file, final name.
    pub file: Option<PathBuf>,
}

impl CallResult {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn is_success(&self) -> bool {
        self.messages.is_empty() && self.response.is_success()
    }

    pub fn json(&self) -> Option<&Value> {
        self.data.as_json()
    }

    /// Deserialize the JSON body.
    pub fn deserialize<T: DeserializeOwned>(&self) -> RestResult<T> {
        let value = self.json().ok_or_else(|| {
            RestError::Protocol(ProtocolError::InvalidResponse {
                message: "response body is not JSON".to_string(),
            })
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            RestError::Protocol(ProtocolError::InvalidResponse {
                message: e.to_string(),
            })
        })
    }
}
