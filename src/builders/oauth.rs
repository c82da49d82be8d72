//! OAuth Parameter Builder
//!
//! Fluent builder for [`OAuthParams`] with per-grant validation.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::parse_url;
use crate::error::{ConfigurationError, RestError, RestResult};
use crate::flows::GrantHandler;
use crate::types::{Grant, JwtAssertion, JwtStyle, OAuthParams};

/// OAuth parameter set builder.
pub struct OAuthParamsBuilder {
    base_url: Option<String>,
    token_path: String,
    authorize_path: String,
    token_field: String,
    expiry_claim: String,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    scope: Option<String>,
    grant: Option<Grant>,
}

impl Default for OAuthParamsBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            token_path: "token".to_string(),
            authorize_path: "authorize".to_string(),
            token_field: "access_token".to_string(),
            expiry_claim: "expires_at".to_string(),
            client_id: None,
            client_secret: None,
            scope: None,
            grant: None,
        }
    }
}

impl OAuthParamsBuilder {
    /// Create new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set authorization server base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Token endpoint path relative to the base URL (default `token`).
    pub fn token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Authorization endpoint path relative to the base URL (default `authorize`).
    pub fn authorize_path(mut self, path: impl Into<String>) -> Self {
        self.authorize_path = path.into();
        self
    }

    /// Token response field holding the access token (default `access_token`).
    pub fn token_field(mut self, field: impl Into<String>) -> Self {
        self.token_field = field.into();
        self
    }

    /// Decoded token claim holding the expiry (default `expires_at`).
    pub fn expiry_claim(mut self, claim: impl Into<String>) -> Self {
        self.expiry_claim = claim.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set default scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the grant directly.
    pub fn grant(mut self, grant: Grant) -> Self {
        self.grant = Some(grant);
        self
    }

    /// Browser based authorization code grant.
    pub fn web(self, redirect_uri: impl Into<String>) -> Self {
        self.grant(Grant::Web {
            redirect_uri: redirect_uri.into(),
        })
    }

    /// JWT bearer grant with the standard claims.
    pub fn jwt(
        self,
        subject: impl Into<String>,
        audience: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        self.grant(Grant::Jwt(JwtAssertion {
            subject: subject.into(),
            audience: audience.into(),
            private_key: SecretString::new(private_key_pem.into()),
            extra_claims: Map::new(),
            style: JwtStyle::Standard,
        }))
    }

    /// Add a claim to the JWT assertion. No effect for other grants.
    pub fn jwt_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        if let Some(Grant::Jwt(assertion)) = &mut self.grant {
            assertion.extra_claims.insert(name.into(), value);
        }
        self
    }

    /// Switch the JWT assertion to the Basic-authenticated variant.
    pub fn jwt_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        if let Some(Grant::Jwt(assertion)) = &mut self.grant {
            assertion.style = JwtStyle::BasicAuth {
                username: username.into(),
                password: SecretString::new(password.into()),
            };
        }
        self
    }

    pub fn url_token(self, token: impl Into<String>, password: Option<String>) -> Self {
        self.grant(Grant::UrlToken {
            token: token.into(),
            password: password.map(SecretString::new),
        })
    }

    pub fn ibm_apikey(self, api_key: impl Into<String>) -> Self {
        self.grant(Grant::IbmApiKey {
            api_key: SecretString::new(api_key.into()),
        })
    }

    pub fn delegated_refresh(
        self,
        api_key: impl Into<String>,
        receiver_client_ids: impl Into<String>,
    ) -> Self {
        self.grant(Grant::DelegatedRefresh {
            api_key: SecretString::new(api_key.into()),
            receiver_client_ids: receiver_client_ids.into(),
        })
    }

    /// Password grant, credentials as HTTP Basic on the token call.
    pub fn header_userpass(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.grant(Grant::HeaderUserPass {
            username: username.into(),
            password: SecretString::new(password.into()),
        })
    }

    /// Password grant, credentials in the form body.
    pub fn body_userpass(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.grant(Grant::BodyUserPass {
            username: username.into(),
            password: SecretString::new(password.into()),
        })
    }

    pub fn body_data(self, body: Value) -> Self {
        self.grant(Grant::BodyData(body))
    }

    /// Caller-registered grant.
    pub fn custom(self, handler: Arc<dyn GrantHandler>) -> Self {
        self.grant(Grant::Custom(handler))
    }

    /// Build the parameter set.
    pub fn build(self) -> RestResult<OAuthParams> {
        let base_url = self.base_url.ok_or_else(|| missing("base_url"))?;
        parse_url(&base_url)?;
        let grant = self.grant.ok_or_else(|| missing("grant"))?;

        match &grant {
            Grant::Web { redirect_uri } => {
                require(self.client_id.as_deref(), "client_id")?;
                parse_url(redirect_uri)?;
            }
            Grant::Jwt(assertion) => {
                require(self.client_id.as_deref(), "client_id")?;
                require(Some(assertion.subject.as_str()), "subject")?;
                require(Some(assertion.audience.as_str()), "audience")?;
                require(Some(assertion.private_key.expose_secret().as_str()), "private_key")?;
                if let JwtStyle::BasicAuth { username, .. } = &assertion.style {
                    require(Some(username.as_str()), "username")?;
                }
            }
            Grant::UrlToken { token, .. } => require(Some(token.as_str()), "url_token")?,
            Grant::IbmApiKey { api_key } => require(Some(api_key.expose_secret().as_str()), "api_key")?,
            Grant::DelegatedRefresh {
                api_key,
                receiver_client_ids,
            } => {
                require(Some(api_key.expose_secret().as_str()), "api_key")?;
                require(Some(receiver_client_ids.as_str()), "receiver_client_ids")?;
            }
            Grant::HeaderUserPass { username, .. } | Grant::BodyUserPass { username, .. } => {
                require(Some(username.as_str()), "username")?
            }
            Grant::BodyData(body) => {
                if !body.is_object() {
                    return Err(RestError::Configuration(ConfigurationError::InvalidValue {
                        name: "body_data".to_string(),
                        value: body.to_string(),
                    }));
                }
            }
            Grant::Custom(_) => {}
        }

        Ok(OAuthParams {
            base_url,
            token_path: self.token_path,
            authorize_path: self.authorize_path,
            token_field: self.token_field,
            expiry_claim: self.expiry_claim,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scope: self.scope,
            grant,
        })
    }
}

fn missing(field: &str) -> RestError {
    RestError::Configuration(ConfigurationError::MissingRequired {
        field: field.to_string(),
    })
}

fn require(value: Option<&str>, field: &str) -> RestResult<()> {
    match value {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(missing(field)),
    }
}

/// Create a new OAuth parameter builder.
pub fn oauth_params() -> OAuthParamsBuilder {
    OAuthParamsBuilder::new()
}
