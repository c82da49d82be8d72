//! JWT Bearer Grant
//!
//! RS256-signed assertion exchanged with
//! `grant_type=urn:ietf:params:oauth:grant-type:jwt-bearer`.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{client_auth, form_fields, token_call};
use crate::client::RestClient;
use crate::core::merge_maps;
use crate::error::{ConfigurationError, RestError, RestResult};
use crate::types::{
    AuthConfig, CallResult, EngineConfig, JwtAssertion, JwtStyle, OAuthParams, RequestBody,
};

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Claims of the assertion, `now` in epoch seconds.
pub fn assertion_claims(
    params: &OAuthParams,
    assertion: &JwtAssertion,
    config: &EngineConfig,
    now: i64,
) -> RestResult<Map<String, Value>> {
    let issuer = params.client_id.as_ref().ok_or_else(|| {
        RestError::Configuration(ConfigurationError::MissingRequired {
            field: "client_id".to_string(),
        })
    })?;

    let mut claims = Map::new();
    claims.insert("iss".to_string(), json!(issuer));
    claims.insert("sub".to_string(), json!(assertion.subject));
    claims.insert("aud".to_string(), json!(assertion.audience));
    claims.insert(
        "exp".to_string(),
        json!(now + config.jwt_lifetime.as_secs() as i64),
    );
    match assertion.style {
        JwtStyle::Standard => {
            claims.insert(
                "nbf".to_string(),
                json!(now - config.jwt_not_before_skew.as_secs() as i64),
            );
        }
        JwtStyle::BasicAuth { .. } => {
            claims.insert("iat".to_string(), json!(now));
            claims.insert("jti".to_string(), json!(uuid::Uuid::new_v4().to_string()));
        }
    }

    Ok(merge_maps(&claims, &assertion.extra_claims))
}

/// Sign the assertion with the configured RSA private key.
pub fn sign_assertion(
    params: &OAuthParams,
    assertion: &JwtAssertion,
    config: &EngineConfig,
) -> RestResult<String> {
    let claims = assertion_claims(params, assertion, config, Utc::now().timestamp())?;

    let key = EncodingKey::from_rsa_pem(assertion.private_key.expose_secret().as_bytes())
        .map_err(|e| {
            RestError::Configuration(ConfigurationError::InvalidKey {
                message: e.to_string(),
            })
        })?;

    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        RestError::Configuration(ConfigurationError::InvalidKey {
            message: format!("JWT encoding failed: {}", e),
        })
    })
}

pub async fn jwt_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    assertion: &JwtAssertion,
    config: &EngineConfig,
) -> RestResult<CallResult> {
    debug!(subject = %assertion.subject, "Running jwt grant");
    let jwt = sign_assertion(params, assertion, config)?;

    let auth = match &assertion.style {
        JwtStyle::Standard => client_auth(params),
        JwtStyle::BasicAuth { username, password } => {
            AuthConfig::basic(username.clone(), password.expose_secret().clone())
        }
    };
    let fields = form_fields(
        params,
        scope,
        json!({ "grant_type": JWT_BEARER_GRANT, "assertion": jwt }),
    );
    token_call(api, params, RequestBody::Form(fields), auth).await
}
