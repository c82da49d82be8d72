//! Integration tests using WireMock
//!
//! These tests drive real HTTP exchanges through the reqwest transport against
//! mock servers: request building, auth resolution, error classification,
//! redirects, downloads and the OAuth token engine.

mod oauth;
mod transport;

use aspera_rest::{
    AuthConfig, EngineConfig, InMemoryTokenCache, OAuthEngine, OAuthParams, RestClient,
    TokenCache, TransportConfig,
};
use std::sync::Arc;
use wiremock::{MockServer, ResponseTemplate};

pub const PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");

/// Helper to create a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to create success response templates.
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Helper to create error response templates.
pub fn error_response(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

/// Client for `server` with the default transport configuration.
pub fn client(server: &MockServer, auth: AuthConfig) -> RestClient {
    client_with_config(server, auth, TransportConfig::default())
}

pub fn client_with_config(
    server: &MockServer,
    auth: AuthConfig,
    config: TransportConfig,
) -> RestClient {
    RestClient::new(format!("{}/api", server.uri()), auth, Arc::new(config))
        .expect("Failed to build client")
}

/// Token engine whose authorization server is `server`.
pub async fn engine(params: OAuthParams, cache: Arc<dyn TokenCache>) -> Arc<OAuthEngine> {
    let api = RestClient::new(
        params.base_url.clone(),
        AuthConfig::None,
        Arc::new(TransportConfig::default()),
    )
    .expect("Failed to build client");
    Arc::new(
        OAuthEngine::with_client(params, api, cache, EngineConfig::default())
            .await
            .expect("Failed to build engine"),
    )
}

pub fn memory_cache() -> Arc<InMemoryTokenCache> {
    Arc::new(InMemoryTokenCache::new())
}
