//! REST Client
//!
//! Executes call descriptors against one base URL: auth resolution, request
//! build, download or decode, error classification, oauth retry and redirect
//! following.

use futures::TryStreamExt;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{
    build_url, origin_of, parse_url, resolve_target, same_origin, stream_to_file, HttpMethod,
    HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport,
};
use crate::error::{CallError, ProtocolError, RestError, RestResult};
use crate::types::{
    basic_authorization, AuthConfig, CallDescriptor, CallResult, QueryValue, RefreshMode,
    ResponseData, TransportConfig,
};

type CallFuture<'a> = Pin<Box<dyn Future<Output = RestResult<CallResult>> + Send + 'a>>;

const JSON: &str = "application/json";

/// Oauth retries after a not-authenticated response: refresh, then full
/// re-authentication.
const MAX_OAUTH_RETRIES: u32 = 2;

/// REST client bound to one base URL.
///
/// The HTTP connection is created on the first call and reused afterwards.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    auth: AuthConfig,
    headers: HashMap<String, String>,
    config: Arc<TransportConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl RestClient {
    /// Create a client using the reqwest transport.
    pub fn new(
        base_url: impl Into<String>,
        auth: AuthConfig,
        config: Arc<TransportConfig>,
    ) -> RestResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::new(config.clone()));
        Self::with_transport(base_url, auth, config, transport)
    }

    /// Create a client with a custom transport.
    pub fn with_transport(
        base_url: impl Into<String>,
        auth: AuthConfig,
        config: Arc<TransportConfig>,
        transport: Arc<dyn HttpTransport>,
    ) -> RestResult<Self> {
        let base_url = base_url.into();
        parse_url(&base_url)?;
        Ok(Self {
            base_url,
            auth,
            headers: HashMap::new(),
            config,
            transport,
        })
    }

    /// Add a header sent with every call unless the descriptor overrides it.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    pub fn config(&self) -> &Arc<TransportConfig> {
        &self.config
    }

    /// Execute one call.
    pub async fn call(&self, descriptor: CallDescriptor) -> RestResult<CallResult> {
        let hops = descriptor.max_redirects;
        self.call_boxed(descriptor, hops).await
    }

    // Boxed so that cross-origin delegation can recurse.
    fn call_boxed(&self, descriptor: CallDescriptor, hops_left: u32) -> CallFuture<'_> {
        Box::pin(self.execute(descriptor, hops_left))
    }

    /// POST a JSON body.
    pub async fn create(&self, subpath: &str, body: Value) -> RestResult<CallResult> {
        self.call(
            CallDescriptor::new(HttpMethod::Post, subpath)
                .json_body(body)
                .header("Accept", JSON),
        )
        .await
    }

    /// GET with optional query parameters.
    pub async fn read(&self, subpath: &str, query: &[(&str, &str)]) -> RestResult<CallResult> {
        let mut descriptor = CallDescriptor::new(HttpMethod::Get, subpath).header("Accept", JSON);
        for (key, value) in query {
            descriptor = descriptor.query(*key, *value);
        }
        self.call(descriptor).await
    }

    /// PUT a JSON body.
    pub async fn update(&self, subpath: &str, body: Value) -> RestResult<CallResult> {
        self.call(CallDescriptor::new(HttpMethod::Put, subpath).json_body(body))
            .await
    }

    pub async fn delete(&self, subpath: &str) -> RestResult<CallResult> {
        self.call(CallDescriptor::new(HttpMethod::Delete, subpath))
            .await
    }

    /// Custom `CANCEL` verb.
    pub async fn cancel(&self, subpath: &str) -> RestResult<CallResult> {
        self.call(CallDescriptor::new(
            HttpMethod::Custom("CANCEL".to_string()),
            subpath,
        ))
        .await
    }

    /// GET streamed into `target`.
    pub async fn download(
        &self,
        subpath: &str,
        target: impl Into<PathBuf>,
    ) -> RestResult<CallResult> {
        self.call(CallDescriptor::new(HttpMethod::Get, subpath).download_to(target))
            .await
    }

    /// `hops_left` is what remains of `descriptor.max_redirects` after hops
    /// taken on other origins.
    async fn execute(&self, descriptor: CallDescriptor, mut hops_left: u32) -> RestResult<CallResult> {
        let auth = descriptor.auth.clone().unwrap_or_else(|| self.auth.clone());
        let base_url = descriptor
            .base_url
            .clone()
            .unwrap_or_else(|| self.base_url.clone());

        let mut headers = self.headers.clone();
        for (name, value) in &descriptor.headers {
            headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        let explicit_authorization = headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"));

        let mut query = descriptor.query.clone();
        if let AuthConfig::Url(credentials) = &auth {
            for (key, value) in credentials {
                query.retain(|(k, _)| k != key);
                query.push((key.clone(), QueryValue::Single(value.clone())));
            }
        }

        let mut url = build_url(&base_url, &descriptor.subpath, &query);
        let mut oauth_retries = 0;
        let mut refresh_mode = RefreshMode::Cached;

        loop {
            let mut request = HttpRequest::new(descriptor.method.clone(), url.clone());
            request.headers = headers.clone();
            if let Some(body) = &descriptor.body {
                if !request.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                    request
                        .headers
                        .insert("Content-Type".to_string(), body.content_type().to_string());
                }
                request.body = Some(body.encode());
            }

            if !explicit_authorization {
                match &auth {
                    AuthConfig::Basic { username, password } => {
                        request.headers.insert(
                            "Authorization".to_string(),
                            basic_authorization(username, password.expose_secret()),
                        );
                    }
                    AuthConfig::OAuth2 { provider, scope } => {
                        let credential = provider.obtain(scope.as_deref(), refresh_mode).await?;
                        request
                            .headers
                            .insert("Authorization".to_string(), credential);
                    }
                    AuthConfig::None | AuthConfig::Url(_) => {}
                }
            }

            let (response, data, file) = self
                .exchange(request.clone(), descriptor.download.as_deref())
                .await?;

            let messages = self.config.pipeline.classify(&request, &response, &data);
            if messages.is_empty() {
                return Ok(CallResult {
                    response,
                    data,
                    messages,
                    file,
                });
            }

            let status = response.status;
            if self.config.not_authenticated_codes.contains(&status)
                && auth.is_oauth2()
                && !explicit_authorization
                && oauth_retries < MAX_OAUTH_RETRIES
            {
                oauth_retries += 1;
                refresh_mode = if oauth_retries == 1 {
                    RefreshMode::Refresh
                } else {
                    RefreshMode::Reauthenticate
                };
                warn!(status, attempt = oauth_retries, mode = ?refresh_mode, "Call not authenticated, renewing token");
                continue;
            }

            if response.is_redirect() && descriptor.max_redirects > 0 {
                if hops_left == 0 {
                    return Err(RestError::Protocol(ProtocolError::TooManyRedirects {
                        max: descriptor.max_redirects,
                    }));
                }
                hops_left -= 1;

                let current = parse_url(&url)?;
                let target = redirect_target(&current, &response)?;
                if same_origin(&current, &target) {
                    info!(status, location = %target, "Following redirect");
                    url = target.to_string();
                    continue;
                }

                info!(status, location = %target, "Following redirect to another origin");
                return self.delegate(&descriptor, &target, hops_left).await;
            }

            let error = CallError::new(request, response, messages);
            if descriptor.return_errors {
                debug!(status, error = %error, "Returning call error to caller");
                return Ok(CallResult {
                    response: error.response,
                    data,
                    messages: error.messages,
                    file,
                });
            }
            return Err(error.into());
        }
    }

    /// Reissue the call through a fresh client scoped to the target origin.
    ///
    /// Credentials of this client are not forwarded to the other origin.
    async fn delegate(
        &self,
        descriptor: &CallDescriptor,
        target: &Url,
        hops_left: u32,
    ) -> RestResult<CallResult> {
        let mut subpath = target.path().to_string();
        if let Some(query) = target.query() {
            subpath.push('?');
            subpath.push_str(query);
        }

        let mut delegated = descriptor.clone();
        delegated.base_url = None;
        delegated.subpath = subpath;
        delegated.query.clear();
        delegated.auth = Some(AuthConfig::None);
        delegated
            .headers
            .retain(|k, _| !k.eq_ignore_ascii_case("authorization"));

        let mut headers = self.headers.clone();
        headers.retain(|k, _| !k.eq_ignore_ascii_case("authorization"));

        let client = RestClient {
            base_url: origin_of(target),
            auth: AuthConfig::None,
            headers,
            config: self.config.clone(),
            transport: self.transport.fork(),
        };
        client.call_boxed(delegated, hops_left).await
    }

    async fn exchange(
        &self,
        request: HttpRequest,
        download: Option<&Path>,
    ) -> RestResult<(HttpResponse, ResponseData, Option<PathBuf>)> {
        debug!(method = request.method.as_str(), url = %request.url, "Sending request");

        let response = match download {
            Some(target) => {
                let (mut response, body) = self.transport.send_streaming(request).await?;
                debug!(status = response.status, "Received response");
                if response.is_success() {
                    let target = resolve_target(target, &response);
                    let file = stream_to_file(
                        body,
                        &target,
                        &self.config.partial_suffix,
                        response.content_length(),
                        self.config.progress.as_deref(),
                    )
                    .await?;
                    return Ok((response, ResponseData::Empty, Some(file)));
                }
                let chunks: Vec<bytes::Bytes> = body.try_collect().await?;
                response.body = chunks.concat().into();
                response
            }
            None => {
                let response = self.transport.send(request).await?;
                debug!(status = response.status, "Received response");
                response
            }
        };

        let data = decode_body(&response);
        Ok((response, data, None))
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish()
    }
}

fn redirect_target(current: &Url, response: &HttpResponse) -> RestResult<Url> {
    let location = response.header("location").ok_or_else(|| {
        RestError::Protocol(ProtocolError::MissingLocation {
            status: response.status,
        })
    })?;
    current.join(location).map_err(|e| {
        RestError::Protocol(ProtocolError::InvalidResponse {
            message: format!("bad Location {}: {}", location, e),
        })
    })
}

/// Decode a body by content type. Invalid JSON degrades to
/// [`ResponseData::Empty`].
pub fn decode_body(response: &HttpResponse) -> ResponseData {
    if response.body.is_empty() {
        return ResponseData::Empty;
    }
    let is_json = response
        .media_type()
        .map(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        .unwrap_or(false);

    if !is_json {
        return ResponseData::Text(response.text());
    }
    match serde_json::from_slice(&response.body) {
        Ok(value) => ResponseData::Json(value),
        Err(e) => {
            debug!(error = %e, "Response body is not valid JSON");
            ResponseData::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ErrorPipeline, SimpleFieldHandler};
    use crate::core::MockHttpTransport;
    use crate::error::NetworkError;
    use crate::token::MockTokenProvider;
    use serde_json::json;

    fn client_with(
        auth: AuthConfig,
        config: TransportConfig,
    ) -> (RestClient, MockHttpTransport) {
        let transport = MockHttpTransport::new();
        let client = RestClient::with_transport(
            "https://api.example.com/v1",
            auth,
            Arc::new(config),
            Arc::new(transport.clone()),
        )
        .unwrap();
        (client, transport)
    }

    fn client() -> (RestClient, MockHttpTransport) {
        client_with(AuthConfig::None, TransportConfig::default())
    }

    fn response(status: u16, content_type: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: String::new(),
            headers: [("content-type".to_string(), content_type.to_string())]
                .into_iter()
                .collect(),
            body: bytes::Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_sends_json() {
        let (client, transport) = client();
        transport.queue_json_response(201, &json!({"id": 1}));

        let result = client.create("users", json!({"name": "a"})).await.unwrap();

        assert_eq!(result.json(), Some(&json!({"id": 1})));
        let request = transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://api.example.com/v1/users");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"a"}"#));
    }

    #[tokio::test]
    async fn test_read_with_query_and_cancel_verb() {
        let (client, transport) = client();
        transport.queue_json_response(200, &json!([]));
        transport.queue_json_response(200, &json!({}));

        client.read("files", &[("q", "a b"), ("page", "2")]).await.unwrap();
        client.cancel("jobs/7").await.unwrap();

        let requests = transport.get_requests();
        assert_eq!(requests[0].url, "https://api.example.com/v1/files?q=a+b&page=2");
        assert_eq!(requests[1].method.as_str(), "CANCEL");
    }

    #[tokio::test]
    async fn test_basic_and_url_auth() {
        let (client, transport) = client_with(
            AuthConfig::basic("Aladdin", "open sesame"),
            TransportConfig::default(),
        );
        transport.queue_json_response(200, &json!({}));
        transport.queue_json_response(200, &json!({}));

        client.delete("x").await.unwrap();
        client
            .call(
                CallDescriptor::new(HttpMethod::Get, "y")
                    .query("api_key", "old")
                    .auth(AuthConfig::url([("api_key", "k"), ("user", "u")])),
            )
            .await
            .unwrap();

        let requests = transport.get_requests();
        assert_eq!(
            requests[0].header("authorization"),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );
        assert_eq!(requests[1].header("authorization"), None);
        assert_eq!(requests[1].url, "https://api.example.com/v1/y?api_key=k&user=u");
    }

    #[tokio::test]
    async fn test_decode_degrades_on_bad_json() {
        let (client, transport) = client();
        transport.queue_response(response(200, "application/json; charset=utf-8", "{oops"));
        transport.queue_response(response(200, "application/vnd.api+json", r#"{"a":1}"#));
        transport.queue_response(response(200, "text/plain", "hello"));

        let bad = client.read("a", &[]).await.unwrap();
        let suffixed = client.read("b", &[]).await.unwrap();
        let text = client.read("c", &[]).await.unwrap();

        assert_eq!(bad.data, ResponseData::Empty);
        assert_eq!(suffixed.json(), Some(&json!({"a": 1})));
        assert_eq!(text.data.as_text(), Some("hello"));
    }

    #[tokio::test]
    async fn test_error_raised_and_returned() {
        let (client, transport) = client();
        transport.queue_response(response(404, "text/plain", "missing"));
        transport.queue_response(response(404, "text/plain", "missing"));

        let error = client.read("nope", &[]).await.unwrap_err();
        assert_eq!(error.status(), Some(404));
        assert_eq!(error.to_string(), "api.example.com 404");

        let result = client
            .call(CallDescriptor::new(HttpMethod::Get, "nope").return_errors(true))
            .await
            .unwrap();
        assert_eq!(result.status(), 404);
        assert_eq!(result.messages, vec!["api.example.com 404"]);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_embedded_error_on_success_status() {
        let pipeline =
            ErrorPipeline::new().with_handler(SimpleFieldHandler::new("error", "user_message", true));
        let (client, transport) = client_with(
            AuthConfig::None,
            TransportConfig {
                pipeline,
                ..Default::default()
            },
        );
        transport.queue_json_response(200, &json!({"error": {"user_message": "bad metadata"}}));

        let error = client.read("pkg", &[]).await.unwrap_err();
        assert_eq!(error.to_string(), "bad metadata");
        assert_eq!(error.status(), Some(200));
    }

    #[tokio::test]
    async fn test_oauth_retry_sequence() {
        let provider = Arc::new(MockTokenProvider::new());
        provider.queue_token("T1").queue_token("T2").queue_token("T3");
        let (client, transport) = client_with(
            AuthConfig::oauth2_scoped(provider.clone(), "user:all"),
            TransportConfig::default(),
        );
        transport.queue_json_response(401, &json!({}));
        transport.queue_json_response(401, &json!({}));
        transport.queue_json_response(200, &json!({"ok": true}));

        let result = client.read("me", &[]).await.unwrap();

        assert_eq!(result.json(), Some(&json!({"ok": true})));
        let scope = Some("user:all".to_string());
        assert_eq!(
            provider.get_history(),
            vec![
                (scope.clone(), RefreshMode::Cached),
                (scope.clone(), RefreshMode::Refresh),
                (scope, RefreshMode::Reauthenticate),
            ]
        );
        let sent: Vec<_> = transport
            .get_requests()
            .iter()
            .map(|r| r.header("authorization").unwrap_or_default().to_string())
            .collect();
        assert_eq!(sent, vec!["Bearer T1", "Bearer T2", "Bearer T3"]);
    }

    #[tokio::test]
    async fn test_oauth_retry_budget_exhausted() {
        let provider = Arc::new(MockTokenProvider::new());
        provider.queue_token("T1").queue_token("T2").queue_token("T3");
        let (client, transport) = client_with(
            AuthConfig::oauth2(provider.clone()),
            TransportConfig::default(),
        );
        transport.set_default_response(response(401, "text/plain", ""));

        let error = client.read("me", &[]).await.unwrap_err();

        assert_eq!(error.status(), Some(401));
        assert_eq!(transport.get_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_explicit_authorization_skips_oauth() {
        let provider = Arc::new(MockTokenProvider::new());
        let (client, transport) = client_with(
            AuthConfig::oauth2(provider.clone()),
            TransportConfig::default(),
        );
        transport.queue_json_response(401, &json!({}));

        let error = client
            .call(CallDescriptor::new(HttpMethod::Get, "me").header("Authorization", "Bearer fixed"))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(401));
        assert!(provider.get_history().is_empty());
        assert_eq!(transport.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_terminal() {
        let provider = Arc::new(MockTokenProvider::new());
        provider.queue_token("T1");
        let (client, transport) = client_with(
            AuthConfig::oauth2(provider.clone()),
            TransportConfig::default(),
        );
        transport.queue_json_response(503, &json!({}));
        transport.set_default_response(response(200, "application/json", "{}"));

        let error = client.read("me", &[]).await.unwrap_err();

        assert_eq!(error.status(), Some(503));
        assert!(matches!(error, RestError::Call(_)));
        assert_eq!(transport.get_requests().len(), 1);
        assert_eq!(provider.get_history().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_without_oauth_is_terminal() {
        let (client, transport) = client_with(
            AuthConfig::basic("alice", "pw"),
            TransportConfig::default(),
        );
        transport.queue_json_response(401, &json!({}));
        transport.set_default_response(response(200, "application/json", "{}"));

        let error = client.read("me", &[]).await.unwrap_err();

        assert_eq!(error.status(), Some(401));
        assert_eq!(transport.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_same_origin_redirect() {
        let (client, transport) = client();
        transport.queue_redirect(302, "/v2/moved?x=1");
        transport.queue_json_response(200, &json!({"moved": true}));

        let result = client
            .call(CallDescriptor::new(HttpMethod::Get, "old").max_redirects(2))
            .await
            .unwrap();

        assert_eq!(result.json(), Some(&json!({"moved": true})));
        assert_eq!(
            transport.get_requests()[1].url,
            "https://api.example.com/v2/moved?x=1"
        );
        assert_eq!(transport.fork_count(), 0);
    }

    #[tokio::test]
    async fn test_redirect_budget_exhausted() {
        let (client, transport) = client();
        transport.set_default_response({
            let mut r = response(302, "text/plain", "");
            r.headers
                .insert("location".to_string(), "/again".to_string());
            r
        });

        let error = client
            .call(CallDescriptor::new(HttpMethod::Get, "loop").max_redirects(1))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RestError::Protocol(ProtocolError::TooManyRedirects { max: 1 })
        ));
        assert_eq!(transport.get_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_redirect_without_budget_is_call_error() {
        let (client, transport) = client();
        transport.queue_redirect(301, "/elsewhere");

        let error = client.read("old", &[]).await.unwrap_err();
        assert_eq!(error.status(), Some(301));
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let (client, transport) = client();
        transport.queue_response(response(302, "text/plain", ""));

        let error = client
            .call(CallDescriptor::new(HttpMethod::Get, "old").max_redirects(3))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            RestError::Protocol(ProtocolError::MissingLocation { status: 302 })
        ));
    }

    #[tokio::test]
    async fn test_cross_origin_redirect_uses_new_client() {
        let (client, transport) = client_with(
            AuthConfig::basic("u", "p"),
            TransportConfig::default(),
        );
        transport.queue_redirect(307, "https://cdn.example.net:8443/blob?sig=abc");
        transport.queue_json_response(200, &json!({"cdn": true}));

        let result = client
            .call(CallDescriptor::new(HttpMethod::Get, "blob").max_redirects(1))
            .await
            .unwrap();

        assert_eq!(result.json(), Some(&json!({"cdn": true})));
        assert_eq!(transport.fork_count(), 1);
        let second = &transport.get_requests()[1];
        assert_eq!(second.url, "https://cdn.example.net:8443/blob?sig=abc");
        assert_eq!(second.header("authorization"), None);
    }

    #[tokio::test]
    async fn test_redirect_budget_spans_origins() {
        let (client, transport) = client();
        transport.queue_redirect(302, "https://cdn.example.net/blob");
        transport.queue_redirect(302, "https://cdn.example.net/blob2");
        transport.set_default_response(response(200, "application/json", "{}"));

        let error = client
            .call(CallDescriptor::new(HttpMethod::Get, "blob").max_redirects(1))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RestError::Protocol(ProtocolError::TooManyRedirects { max: 1 })
        ));
        assert_eq!(transport.get_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let (client, _transport) = client();
        let error = client.read("x", &[]).await.unwrap_err();
        assert!(matches!(
            error,
            RestError::Network(NetworkError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_with_content_disposition() {
        let dir = tempfile::tempdir().unwrap();
        let (client, transport) = client();
        let mut file = response(200, "application/octet-stream", "payload");
        file.headers.insert(
            "content-disposition".to_string(),
            "attachment; filename=\"report.csv\"".to_string(),
        );
        transport.queue_response(file);

        let result = client
            .download("files/1/content", dir.path().join("requested.bin"))
            .await
            .unwrap();

        let path = result.file.unwrap();
        assert_eq!(path, dir.path().join("report.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "payload");
        assert!(!dir.path().join("requested.bin").exists());
        assert_eq!(result.data, ResponseData::Empty);
    }

    #[tokio::test]
    async fn test_download_error_status_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (client, transport) = client();
        transport.queue_json_response(403, &json!({"error": {"user_message": "denied"}}));

        let error = client
            .download("files/1/content", dir.path().join("out.bin"))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(403));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
