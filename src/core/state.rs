//! State Management
//!
//! Web-grant `state` parameter generation and validation.

use rand::Rng;

use crate::error::{ProtocolError, RestError, RestResult};

/// Generate a random state parameter (32 bytes, URL-safe base64).
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Validate the state echoed by the authorization server.
pub fn validate_state(expected: &str, received: Option<&str>) -> RestResult<()> {
    match received {
        Some(received) if received == expected => Ok(()),
        other => Err(RestError::Protocol(ProtocolError::StateMismatch {
            expected: expected.to_string(),
            received: other.unwrap_or_default().to_string(),
        })),
    }
}
