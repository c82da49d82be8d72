//! Token Management
//!
//! Everything between a scope and a bearer credential.
//!
//! - **Token Cache**: key/value store contract with in-memory and file backends
//! - **Decoder Registry**: ordered token decoders used for expiry detection
//! - **Fingerprint**: deterministic cache key per (scope, parameter set)
//! - **Token Engine**: cache, refresh and grant orchestration

pub mod cache;
pub mod decoder;
pub mod engine;
pub mod fingerprint;
pub mod provider;

pub use cache::{FileTokenCache, InMemoryTokenCache, MockTokenCache, TokenCache};
pub use decoder::{claim_expiry, decode_dotted_json, Claims, DecoderRegistry, TokenDecoder};
pub use engine::OAuthEngine;
pub use fingerprint::{fingerprint, grant_identity, TOKEN_CATEGORY};
pub use provider::{MockTokenProvider, TokenProvider};
