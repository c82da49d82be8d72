//! Grant Flows
//!
//! Token endpoint protocols for every supported grant, plus the extension
//! point for caller-registered grants.
//!
//! - **web**: authorization code through the system browser and a local
//!   callback listener
//! - **jwt**: RS256-signed assertion (standard or Basic-authenticated variant)
//! - **url_token**, **ibm_apikey**, **delegated_refresh**
//! - **header_userpass**, **body_userpass**: password grant variants
//! - **body_data**: caller supplied JSON body

pub mod credentials;
pub mod jwt;
pub mod web;

pub use credentials::*;
pub use jwt::*;
pub use web::*;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};

use crate::client::RestClient;
use crate::core::{merge_maps, BrowserLauncher, CallbackListener, HttpMethod};
use crate::error::RestResult;
use crate::types::{
    AuthConfig, CallDescriptor, CallResult, EngineConfig, Grant, OAuthParams, RequestBody,
};

/// Caller-registered grant protocol.
#[async_trait]
pub trait GrantHandler: Send + Sync {
    /// Grant name, part of the cache fingerprint.
    fn name(&self) -> &str;

    /// Value distinguishing two parameter sets of this grant in the cache.
    fn identity(&self) -> Value {
        Value::Null
    }

    /// Run the grant against the token endpoint. The result body must be the
    /// token record.
    async fn create_token(
        &self,
        api: &RestClient,
        params: &OAuthParams,
        scope: Option<&str>,
    ) -> RestResult<CallResult>;
}

/// Collaborators available to a grant run.
pub struct GrantContext<'a> {
    /// Client bound to the authorization server base URL.
    pub api: &'a RestClient,
    pub params: &'a OAuthParams,
    pub scope: Option<&'a str>,
    pub config: &'a EngineConfig,
    pub browser: &'a dyn BrowserLauncher,
    pub listener: &'a dyn CallbackListener,
}

/// Execute the grant configured in `params`.
pub async fn run_grant(ctx: &GrantContext<'_>) -> RestResult<CallResult> {
    let (api, params, scope) = (ctx.api, ctx.params, ctx.scope);
    match &params.grant {
        Grant::Web { redirect_uri } => web_grant(ctx, redirect_uri).await,
        Grant::Jwt(assertion) => jwt_grant(api, params, scope, assertion, ctx.config).await,
        Grant::UrlToken { token, password } => {
            url_token_grant(api, params, scope, token, password.as_ref()).await
        }
        Grant::IbmApiKey { api_key } => ibm_apikey_grant(api, params, scope, api_key).await,
        Grant::DelegatedRefresh {
            api_key,
            receiver_client_ids,
        } => delegated_refresh_grant(api, params, scope, api_key, receiver_client_ids).await,
        Grant::HeaderUserPass { username, password } => {
            header_userpass_grant(api, params, scope, username, password).await
        }
        Grant::BodyUserPass { username, password } => {
            body_userpass_grant(api, params, scope, username, password).await
        }
        Grant::BodyData(body) => body_data_grant(api, params, body).await,
        Grant::Custom(handler) => handler.create_token(api, params, scope).await,
    }
}

/// Exchange a refresh token.
pub async fn refresh_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    refresh_token: &str,
) -> RestResult<CallResult> {
    let fields = form_fields(
        params,
        scope,
        json!({"grant_type": "refresh_token", "refresh_token": refresh_token}),
    );
    token_call(api, params, RequestBody::Form(fields), client_auth(params)).await
}

/// HTTP Basic with the client credentials, when both are configured.
pub(crate) fn client_auth(params: &OAuthParams) -> AuthConfig {
    match (&params.client_id, &params.client_secret) {
        (Some(id), Some(secret)) => AuthConfig::basic(id.clone(), secret.expose_secret().clone()),
        _ => AuthConfig::None,
    }
}

/// `scope` and `client_id` merged under the grant-specific fields.
pub(crate) fn grant_fields(
    params: &OAuthParams,
    scope: Option<&str>,
    fields: Value,
) -> Map<String, Value> {
    let mut base = Map::new();
    if let Some(scope) = scope {
        base.insert("scope".to_string(), json!(scope));
    }
    if let Some(client_id) = &params.client_id {
        base.insert("client_id".to_string(), json!(client_id));
    }
    match fields {
        Value::Object(fields) => merge_maps(&base, &fields),
        _ => base,
    }
}

/// Grant fields as form pairs. Non-string scalars are rendered as JSON text.
pub(crate) fn form_fields(
    params: &OAuthParams,
    scope: Option<&str>,
    fields: Value,
) -> Vec<(String, String)> {
    grant_fields(params, scope, fields)
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect()
}

/// POST to the token endpoint.
pub(crate) async fn token_call(
    api: &RestClient,
    params: &OAuthParams,
    body: RequestBody,
    auth: AuthConfig,
) -> RestResult<CallResult> {
    token_call_with(
        api,
        CallDescriptor::new(HttpMethod::Post, params.token_path.clone()),
        body,
        auth,
    )
    .await
}

pub(crate) async fn token_call_with(
    api: &RestClient,
    descriptor: CallDescriptor,
    body: RequestBody,
    auth: AuthConfig,
) -> RestResult<CallResult> {
    let mut descriptor = descriptor.header("Accept", "application/json").auth(auth);
    descriptor.body = Some(body);
    api.call(descriptor).await
}
