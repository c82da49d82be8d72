//! Integration tests for the OAuth token engine

use super::*;
use aspera_rest::{
    fingerprint, oauth_params, AuthConfig, BrowserLauncher, FileTokenCache, LocalCallbackListener,
    ProtocolError, RefreshMode, RestError, TokenProvider, TokenRecord,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer};

const JWT_GRANT: &str = "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";

fn token_url(server: &MockServer) -> String {
    format!("{}/oauth2", server.uri())
}

/// Dotted token whose decoded payload expires `seconds` from now.
fn token_expiring_in(seconds: i64) -> String {
    let expires_at = chrono::Utc::now() + chrono::Duration::seconds(seconds);
    let payload = json!({"expires_at": expires_at.to_rfc3339()});
    format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string()))
}

fn body_data_params(server: &MockServer) -> OAuthParams {
    oauth_params()
        .base_url(token_url(server))
        .client_id("cli")
        .client_secret("sec")
        .scope("user:all")
        .body_data(json!({"grant_type": "client_credentials", "client_id": "cli"}))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_jwt_grant_token_reused_from_cache() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains(JWT_GRANT))
        .and(body_string_contains("assertion="))
        .and(header("authorization", "Basic Y2xpOnNlYw=="))
        .respond_with(success_response(
            json!({"access_token": "T1", "token_type": "bearer"}),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(success_response(json!({"name": "alice"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let params = oauth_params()
        .base_url(token_url(&mock_server))
        .client_id("cli")
        .client_secret("sec")
        .scope("user:all")
        .jwt("alice@example.com", "https://api.example.com/token", PRIVATE_KEY)
        .build()
        .unwrap();
    let engine = engine(params, memory_cache()).await;
    let api = client(&mock_server, AuthConfig::oauth2(engine));

    for _ in 0..2 {
        let me = api.read("self", &[]).await.unwrap();
        assert_eq!(me.json().unwrap()["name"], "alice");
    }
}

#[tokio::test]
async fn test_preemptive_refresh() {
    let mock_server = setup_mock_server().await;
    let params = body_data_params(&mock_server);
    let cache = memory_cache();
    let key = fingerprint(Some("user:all"), &params).unwrap();
    cache
        .put(
            &key,
            &json!({"access_token": token_expiring_in(600), "refresh_token": "R1"}).to_string(),
        )
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(success_response(json!({"access_token": "T2"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine(params, cache.clone()).await;

    let credential = engine.obtain(None, RefreshMode::Cached).await.unwrap();
    assert_eq!(credential, "Bearer T2");

    let stored = TokenRecord::from_json(&cache.get(&key).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored.refresh_token(), Some("R1"));

    // Served from cache now.
    assert_eq!(
        engine.obtain(None, RefreshMode::Cached).await.unwrap(),
        "Bearer T2"
    );
}

#[tokio::test]
async fn test_refresh_failure_runs_full_grant() {
    let mock_server = setup_mock_server().await;
    let params = body_data_params(&mock_server);
    let cache = memory_cache();
    let key = fingerprint(Some("user:all"), &params).unwrap();
    cache
        .put(
            &key,
            &json!({"access_token": token_expiring_in(60), "refresh_token": "R1"}).to_string(),
        )
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(error_response(400, json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_json(json!({"grant_type": "client_credentials", "client_id": "cli"})))
        .respond_with(success_response(json!({"access_token": "T3"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine(params, cache.clone()).await;

    assert_eq!(
        engine.obtain(None, RefreshMode::Cached).await.unwrap(),
        "Bearer T3"
    );
    let stored = TokenRecord::from_json(&cache.get(&key).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored.field("access_token"), Some("T3"));
    assert_eq!(stored.refresh_token(), None);
}

#[tokio::test]
async fn test_unauthorized_call_refreshes_and_retries() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_json(json!({"grant_type": "client_credentials", "client_id": "cli"})))
        .respond_with(success_response(
            json!({"access_token": "T1", "refresh_token": "R1"}),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(success_response(json!({"access_token": "T2"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(error_response(401, json!({"error": "expired"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(success_response(json!({"name": "alice"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine(body_data_params(&mock_server), memory_cache()).await;
    let api = client(&mock_server, AuthConfig::oauth2(engine));

    let me = api.read("self", &[]).await.unwrap();
    assert_eq!(me.json().unwrap()["name"], "alice");
}

#[tokio::test]
async fn test_unauthorized_after_reauthentication_propagates() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(success_response(json!({"access_token": "T"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self"))
        .respond_with(error_response(401, json!({"error": "nope"})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let engine = engine(body_data_params(&mock_server), memory_cache()).await;
    let api = client(&mock_server, AuthConfig::oauth2(engine));

    let error = api.read("self", &[]).await.unwrap_err();
    assert_eq!(error.status(), Some(401));
    assert!(matches!(error, RestError::Call(_)));
}

#[tokio::test]
async fn test_missing_token_field_is_fatal() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(success_response(json!({"token": "T"})))
        .mount(&mock_server)
        .await;

    let cache = memory_cache();
    let engine = engine(body_data_params(&mock_server), cache.clone()).await;

    let error = engine.obtain(None, RefreshMode::Cached).await.unwrap_err();
    assert!(matches!(
        error,
        RestError::Protocol(ProtocolError::MissingField { .. })
    ));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_header_userpass_grant() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("authorization", "Basic YWxpY2U6cHc="))
        .and(body_json(json!({"grant_type": "password", "client_id": "cli", "scope": "user:all"})))
        .respond_with(success_response(json!({"access_token": "UP"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = oauth_params()
        .base_url(token_url(&mock_server))
        .client_id("cli")
        .scope("user:all")
        .header_userpass("alice", "pw")
        .build()
        .unwrap();
    let engine = engine(params, memory_cache()).await;

    assert_eq!(
        engine.obtain(None, RefreshMode::Cached).await.unwrap(),
        "Bearer UP"
    );
}

#[tokio::test]
async fn test_url_token_grant() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(query_param("grant_type", "url_token"))
        .and(body_json(json!({"url_token": "LINK"})))
        .respond_with(success_response(json!({"access_token": "PUB"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = oauth_params()
        .base_url(token_url(&mock_server))
        .url_token("LINK", None)
        .build()
        .unwrap();
    let engine = engine(params, memory_cache()).await;

    assert_eq!(
        engine.obtain(None, RefreshMode::Cached).await.unwrap(),
        "Bearer PUB"
    );
}

#[tokio::test]
async fn test_file_cache_shared_across_engines() {
    let mock_server = setup_mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(success_response(json!({"access_token": "FILE"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    for _ in 0..2 {
        let cache = Arc::new(FileTokenCache::new(dir.path()));
        let engine = engine(body_data_params(&mock_server), cache).await;
        assert_eq!(
            engine.obtain(None, RefreshMode::Cached).await.unwrap(),
            "Bearer FILE"
        );
    }
}

/// Browser stand-in: follows the authorization URL by calling the redirect
/// URI the way the authorization server would.
struct RedirectingBrowser {
    code: &'static str,
}

impl BrowserLauncher for RedirectingBrowser {
    fn open(&self, uri: &str) {
        let url = url::Url::parse(uri).unwrap();
        let query: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        let callback = format!(
            "{}?code={}&state={}",
            query["redirect_uri"], self.code, query["state"]
        );
        tokio::spawn(async move {
            reqwest::get(callback).await.unwrap();
        });
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_web_grant_through_local_listener() {
    let mock_server = setup_mock_server().await;
    let redirect_uri = format!("http://127.0.0.1:{}/callback", free_port());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=XYZ"))
        .respond_with(success_response(json!({"access_token": "WEB"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = oauth_params()
        .base_url(token_url(&mock_server))
        .client_id("cli")
        .client_secret("sec")
        .web(redirect_uri)
        .build()
        .unwrap();
    let api = RestClient::new(
        params.base_url.clone(),
        AuthConfig::None,
        Arc::new(TransportConfig::default()),
    )
    .unwrap();
    let engine = OAuthEngine::with_client(params, api, memory_cache(), EngineConfig::default())
        .await
        .unwrap()
        .with_browser(Arc::new(RedirectingBrowser { code: "XYZ" }))
        .with_listener(Arc::new(LocalCallbackListener));

    assert_eq!(
        engine.obtain(None, RefreshMode::Cached).await.unwrap(),
        "Bearer WEB"
    );
}
