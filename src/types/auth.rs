//! Authentication Types
//!
//! Per-call authentication settings.

use secrecy::SecretString;
use std::sync::Arc;

use crate::token::TokenProvider;

/// How a call authenticates.
#[derive(Clone, Default)]
pub enum AuthConfig {
    #[default]
    None,
    /// HTTP Basic, applied when the request is built.
    Basic {
        username: String,
        password: SecretString,
    },
    /// Bearer token from a token provider (usually an
    /// [`OAuthEngine`](crate::token::OAuthEngine)).
    OAuth2 {
        provider: Arc<dyn TokenProvider>,
        /// Requested scope; the provider default when unset.
        scope: Option<String>,
    },
    /// Fixed credentials merged into the query string.
    Url(Vec<(String, String)>),
}

impl AuthConfig {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn oauth2(provider: Arc<dyn TokenProvider>) -> Self {
        Self::OAuth2 {
            provider,
            scope: None,
        }
    }

    pub fn oauth2_scoped(provider: Arc<dyn TokenProvider>, scope: impl Into<String>) -> Self {
        Self::OAuth2 {
            provider,
            scope: Some(scope.into()),
        }
    }

    pub fn url<K: Into<String>, V: Into<String>>(
        credentials: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self::Url(
            credentials
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::OAuth2 { .. } => "oauth2",
            Self::Url(_) => "url",
        }
    }

    pub fn is_oauth2(&self) -> bool {
        matches!(self, Self::OAuth2 { .. })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::OAuth2 { scope, .. } => f.debug_struct("OAuth2").field("scope", scope).finish(),
            Self::Url(credentials) => f
                .debug_tuple("Url")
                .field(&credentials.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Encode an HTTP Basic `Authorization` header value.
pub fn basic_authorization(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!(
        "Basic {}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, credentials)
    )
}
