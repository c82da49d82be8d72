//! Cache Fingerprint
//!
//! Deterministic cache key for (scope, parameter set). Secrets that only
//! authorize (client secret, passwords) never take part.

use secrecy::ExposeSecret;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use url::Url;

use crate::core::parse_url;
use crate::error::RestResult;
use crate::types::{Grant, OAuthParams};

/// Cache category of token records.
pub const TOKEN_CATEGORY: &str = "token";

/// Value distinguishing two parameter sets of the same grant.
pub fn grant_identity(grant: &Grant) -> Value {
    match grant {
        Grant::Web { .. } => Value::Null,
        Grant::Jwt(assertion) => json!(assertion.subject),
        Grant::UrlToken { token, .. } => json!(token),
        Grant::IbmApiKey { api_key } => json!(api_key.expose_secret()),
        Grant::DelegatedRefresh { api_key, .. } => json!(api_key.expose_secret()),
        Grant::HeaderUserPass { username, .. } | Grant::BodyUserPass { username, .. } => {
            json!(username)
        }
        Grant::BodyData(body) => body.clone(),
        Grant::Custom(handler) => handler.identity(),
    }
}

/// `token_<sha256 hex>` for the given scope and parameters.
pub fn fingerprint(scope: Option<&str>, params: &OAuthParams) -> RestResult<String> {
    let token_url: Url = parse_url(&params.token_url())?;
    let material = json!([
        TOKEN_CATEGORY,
        scope,
        token_url.host_str(),
        token_url.port_or_known_default(),
        token_url.path(),
        params.grant.name(),
        params.client_id,
        grant_identity(&params.grant),
    ]);

    let digest = Sha256::digest(material.to_string().as_bytes());
    Ok(format!("{}_{}", TOKEN_CATEGORY, hex::encode(digest)))
}
