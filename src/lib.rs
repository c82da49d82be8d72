//! Aspera REST Core
//!
//! REST transport, OAuth token engine and error classification shared by
//! Aspera API clients.
//!
//! # Features
//!
//! - Call descriptors executed against one base URL with a lazily created,
//!   reused HTTP client
//! - Auth resolution: none, HTTP Basic, OAuth2 bearer, URL-embedded credentials
//! - Content-type aware body decoding and streamed file download
//! - Bounded redirect following, including cross-origin delegation
//! - Refresh then re-authentication on `401` for OAuth2 calls
//! - Token caching by fingerprint with preemptive refresh from decoded expiry
//! - Grants: web, jwt, url_token, ibm_apikey, delegated_refresh,
//!   header_userpass, body_userpass, body_data and caller-registered grants
//! - Error classification pipeline turning any exchange, including `200`
//!   responses with embedded errors, into readable messages
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aspera_rest::{oauth_params, transport_config, AuthConfig, FileTokenCache, OAuthEngine, RestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = transport_config().build_shared();
//!
//!     let params = oauth_params()
//!         .base_url("https://api.example.com/api/v1/oauth2/acme")
//!         .client_id("my-client")
//!         .client_secret("my-secret")
//!         .scope("user:all")
//!         .jwt("alice@example.com", "https://api.example.com/api/v1/oauth2/token", pem)
//!         .build()?;
//!
//!     let cache = Arc::new(FileTokenCache::new("/home/alice/.cache/aspera"));
//!     let engine = Arc::new(OAuthEngine::new(params, cache, transport.clone()).await?);
//!
//!     let api = RestClient::new(
//!         "https://api.example.com/api/v1",
//!         AuthConfig::oauth2(engine),
//!         transport,
//!     )?;
//!     let me = api.read("self", &[]).await?;
//!     println!("{:?}", me.json());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: call descriptors, auth, OAuth parameters and configuration types
//! - `error`: error hierarchy
//! - `core`: HTTP transport, URL handling, downloads, browser and callback listener
//! - `classify`: error classification pipeline and built-in handlers
//! - `flows`: grant protocols
//! - `token`: token cache, decoders, fingerprint and the token engine
//! - `builders`: fluent builders for configuration
//! - `client`: the REST client tying everything together

pub mod builders;
pub mod classify;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{decode_body, RestClient};

// Re-export builders
pub use builders::{oauth_params, transport_config, OAuthParamsBuilder, TransportConfigBuilder};

// Re-export errors
pub use error::{
    CallError, ConfigurationError, DownloadError, NetworkError, ProtocolError, RestError,
    RestResult, StorageError,
};

// Re-export types
pub use types::{
    // Auth
    basic_authorization, AuthConfig,
    // Calls
    CallDescriptor, CallResult, QueryValue, RequestBody, ResponseData,
    // Callback
    CallbackParams,
    // Config
    EngineConfig, SessionHook, TransportConfig,
    // OAuth
    Grant, JwtAssertion, JwtStyle, OAuthParams,
    // Token
    RefreshMode, TokenRecord,
};

// Re-export core components
pub use crate::core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Download
    DownloadProgress,
    // Browser and callback
    BrowserLauncher, CallbackListener, LocalCallbackListener, MockBrowserLauncher,
    MockCallbackListener, SystemBrowser,
    // Merge
    deep_merge,
};

// Re-export error classification
pub use classify::{
    errors_map_handler, graphql_errors_handler, transfer_spec_errors_handler, ErrorContext,
    ErrorHandler, ErrorPipeline, FnHandler, GenericHandler, HandlerError, SimpleFieldHandler,
};

// Re-export flows
pub use flows::{GrantContext, GrantHandler};

// Re-export token management
pub use token::{
    // Cache
    FileTokenCache, InMemoryTokenCache, MockTokenCache, TokenCache,
    // Decoders
    decode_dotted_json, DecoderRegistry, TokenDecoder,
    // Engine
    fingerprint, MockTokenProvider, OAuthEngine, TokenProvider,
};
