//! OAuth Parameter Types
//!
//! Token endpoint coordinates and grant definitions.

use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::join_path;
use crate::flows::GrantHandler;

/// OAuth parameter set owned by one token engine.
#[derive(Clone)]
pub struct OAuthParams {
    /// Authorization server base URL.
    pub base_url: String,
    /// Token endpoint, relative to `base_url`.
    pub token_path: String,
    /// Authorization endpoint, relative to `base_url`.
    pub authorize_path: String,
    /// Field of the token response holding the access token.
    pub token_field: String,
    /// Claim of a decoded access token holding its expiry.
    pub expiry_claim: String,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Default scope.
    pub scope: Option<String>,
    pub grant: Grant,
}

impl OAuthParams {
    pub fn token_url(&self) -> String {
        join_path(&self.base_url, &self.token_path)
    }

    pub fn authorize_url(&self) -> String {
        join_path(&self.base_url, &self.authorize_path)
    }
}

impl std::fmt::Debug for OAuthParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthParams")
            .field("base_url", &self.base_url)
            .field("token_path", &self.token_path)
            .field("authorize_path", &self.authorize_path)
            .field("token_field", &self.token_field)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("grant", &self.grant.name())
            .finish()
    }
}

/// Grant protocol with its specific fields.
#[derive(Clone)]
pub enum Grant {
    /// Authorization code through the user's browser.
    Web { redirect_uri: String },
    /// Signed JWT assertion.
    Jwt(JwtAssertion),
    /// Public link token.
    UrlToken {
        token: String,
        password: Option<SecretString>,
    },
    /// IBM Cloud IAM API key.
    IbmApiKey { api_key: SecretString },
    /// IBM Cloud IAM delegated refresh token.
    DelegatedRefresh {
        api_key: SecretString,
        receiver_client_ids: String,
    },
    /// Password grant, resource owner credentials as HTTP Basic.
    HeaderUserPass {
        username: String,
        password: SecretString,
    },
    /// Password grant, resource owner credentials in the form body.
    BodyUserPass {
        username: String,
        password: SecretString,
    },
    /// Caller-supplied JSON body, sent verbatim.
    BodyData(Value),
    /// Caller-registered grant.
    Custom(Arc<dyn GrantHandler>),
}

impl Grant {
    /// Grant name, part of the cache fingerprint.
    pub fn name(&self) -> &str {
        match self {
            Self::Web { .. } => "web",
            Self::Jwt(_) => "jwt",
            Self::UrlToken { .. } => "url_token",
            Self::IbmApiKey { .. } => "ibm_apikey",
            Self::DelegatedRefresh { .. } => "delegated_refresh",
            Self::HeaderUserPass { .. } => "header_userpass",
            Self::BodyUserPass { .. } => "body_userpass",
            Self::BodyData(_) => "body_data",
            Self::Custom(handler) => handler.name(),
        }
    }
}

/// JWT bearer assertion settings.
#[derive(Clone)]
pub struct JwtAssertion {
    pub subject: String,
    pub audience: String,
    /// PEM encoded RSA private key.
    pub private_key: SecretString,
    /// Merged over the standard claims.
    pub extra_claims: Map<String, Value>,
    pub style: JwtStyle,
}

/// JWT assertion flavour.
#[derive(Clone)]
pub enum JwtStyle {
    /// `nbf` back-dated, token endpoint authenticated with the client credentials.
    Standard,
    /// `iat` and `jti` instead of `nbf`, token endpoint authenticated with
    /// HTTP Basic using these credentials.
    BasicAuth {
        username: String,
        password: SecretString,
    },
}
