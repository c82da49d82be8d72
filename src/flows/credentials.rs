//! Credential Grants
//!
//! Non-interactive grants: url token, IBM API key variants, password grants
//! and caller-supplied bodies.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use super::{client_auth, form_fields, grant_fields, token_call, token_call_with};
use crate::client::RestClient;
use crate::core::HttpMethod;
use crate::error::RestResult;
use crate::types::{AuthConfig, CallDescriptor, CallResult, OAuthParams, RequestBody};

const IBM_APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Public link token. `grant_type` and `scope` travel in the query string.
pub async fn url_token_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    token: &str,
    password: Option<&SecretString>,
) -> RestResult<CallResult> {
    debug!("Running url_token grant");
    let mut body = json!({ "url_token": token });
    if let Some(password) = password {
        body["password"] = json!(password.expose_secret());
    }

    let mut descriptor = CallDescriptor::new(HttpMethod::Post, params.token_path.clone())
        .query("grant_type", "url_token");
    if let Some(scope) = scope {
        descriptor = descriptor.query("scope", scope);
    }
    token_call_with(api, descriptor, RequestBody::Json(body), client_auth(params)).await
}

pub async fn ibm_apikey_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    api_key: &SecretString,
) -> RestResult<CallResult> {
    debug!("Running ibm_apikey grant");
    let fields = form_fields(
        params,
        scope,
        json!({
            "grant_type": IBM_APIKEY_GRANT,
            "response_type": "cloud_iam",
            "apikey": api_key.expose_secret(),
        }),
    );
    token_call(api, params, RequestBody::Form(fields), client_auth(params)).await
}

pub async fn delegated_refresh_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    api_key: &SecretString,
    receiver_client_ids: &str,
) -> RestResult<CallResult> {
    debug!("Running delegated_refresh grant");
    let fields = form_fields(
        params,
        scope,
        json!({
            "grant_type": IBM_APIKEY_GRANT,
            "response_type": "delegated_refresh_token",
            "apikey": api_key.expose_secret(),
            "receiver_client_ids": receiver_client_ids,
        }),
    );
    token_call(api, params, RequestBody::Form(fields), client_auth(params)).await
}

/// Password grant; the token endpoint call itself is authenticated with the
/// resource owner credentials.
pub async fn header_userpass_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    username: &str,
    password: &SecretString,
) -> RestResult<CallResult> {
    debug!(username = %username, "Running header_userpass grant");
    let body = grant_fields(params, scope, json!({ "grant_type": "password" }));
    token_call(
        api,
        params,
        RequestBody::Json(Value::Object(body)),
        AuthConfig::basic(username, password.expose_secret().clone()),
    )
    .await
}

/// Password grant with the resource owner credentials in the form body.
pub async fn body_userpass_grant(
    api: &RestClient,
    params: &OAuthParams,
    scope: Option<&str>,
    username: &str,
    password: &SecretString,
) -> RestResult<CallResult> {
    debug!(username = %username, "Running body_userpass grant");
    let fields = form_fields(
        params,
        scope,
        json!({
            "grant_type": "password",
            "username": username,
            "password": password.expose_secret(),
        }),
    );
    token_call(api, params, RequestBody::Form(fields), client_auth(params)).await
}

/// Caller-supplied body, sent as is and unauthenticated.
pub async fn body_data_grant(
    api: &RestClient,
    params: &OAuthParams,
    body: &Value,
) -> RestResult<CallResult> {
    debug!("Running body_data grant");
    token_call(api, params, RequestBody::Json(body.clone()), AuthConfig::None).await
}
