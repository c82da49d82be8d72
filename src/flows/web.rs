//! Web Grant
//!
//! Authorization code obtained through the user's browser and a local
//! callback listener, then exchanged at the token endpoint.

use serde_json::json;
use tracing::{debug, info};

use super::{client_auth, form_fields, token_call, GrantContext};
use crate::core::{build_url, generate_state, parse_url, validate_state};
use crate::error::{ProtocolError, RestError, RestResult};
use crate::types::{CallResult, CallbackParams, OAuthParams, QueryValue, RequestBody};

/// Authorization URL the user is sent to.
pub fn authorization_url(
    params: &OAuthParams,
    scope: Option<&str>,
    redirect_uri: &str,
    state: &str,
) -> String {
    let mut query = vec![
        ("response_type".to_string(), QueryValue::from("code")),
        (
            "client_id".to_string(),
            QueryValue::from(params.client_id.clone().unwrap_or_default()),
        ),
        ("redirect_uri".to_string(), QueryValue::from(redirect_uri)),
    ];
    if let Some(scope) = scope {
        query.push(("scope".to_string(), QueryValue::from(scope)));
    }
    query.push(("state".to_string(), QueryValue::from(state)));

    build_url(&params.authorize_url(), "", &query)
}

/// Check the callback and extract the authorization code.
pub fn authorization_code(callback: CallbackParams, expected_state: &str) -> RestResult<String> {
    if let Some(error) = callback.error {
        return Err(RestError::Protocol(ProtocolError::AuthorizationDenied {
            error,
            error_description: callback.error_description,
        }));
    }
    validate_state(expected_state, callback.state.as_deref())?;
    callback
        .code
        .ok_or(RestError::Protocol(ProtocolError::MissingCode))
}

pub async fn web_grant(ctx: &GrantContext<'_>, redirect_uri: &str) -> RestResult<CallResult> {
    let redirect = parse_url(redirect_uri)?;
    let state = generate_state();
    let url = authorization_url(ctx.params, ctx.scope, redirect_uri, &state);

    info!(redirect_uri = %redirect, "Waiting for browser authorization");
    let browser = ctx.browser;
    let callback = ctx
        .listener
        .capture(&redirect, Box::new(move || browser.open(&url)))
        .await?;
    let code = authorization_code(callback, &state)?;
    debug!("Authorization code received");

    let fields = form_fields(
        ctx.params,
        ctx.scope,
        json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
        }),
    );
    token_call(
        ctx.api,
        ctx.params,
        RequestBody::Form(fields),
        client_auth(ctx.params),
    )
    .await
}
