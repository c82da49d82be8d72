//! Token Decoder Registry
//!
//! Try-in-order decoders extracting claims from opaque bearer tokens.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

/// Decoded token claims.
pub type Claims = Map<String, Value>;

/// A decoder returns `None` when it does not understand the token.
pub type TokenDecoder = Arc<dyn Fn(&str) -> Option<Claims> + Send + Sync>;

/// Append-only list of token decoders.
pub struct DecoderRegistry {
    decoders: RwLock<Vec<TokenDecoder>>,
}

impl DecoderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(Vec::new()),
        }
    }

    /// Registry holding the dot-delimited base64 JSON decoder.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(decode_dotted_json);
        registry
    }

    /// Append a decoder. Earlier registrations are tried first.
    pub fn register<F>(&self, decoder: F)
    where
        F: Fn(&str) -> Option<Claims> + Send + Sync + 'static,
    {
        self.decoders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Arc::new(decoder));
    }

    pub fn len(&self) -> usize {
        self.decoders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First successful decode, or `None` if the token is undecodable.
    pub fn decode(&self, token: &str) -> Option<Claims> {
        self.decoders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find_map(|decoder| decoder(token))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.len())
            .finish()
    }
}

/// Decode the middle part of a three-part dotted token as base64 JSON.
///
/// Both alphabets are accepted, with or without padding.
pub fn decode_dotted_json(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = [URL_SAFE_NO_PAD, URL_SAFE, STANDARD_NO_PAD, STANDARD]
        .iter()
        .find_map(|engine| engine.decode(payload).ok())?;

    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Expiry from decoded claims.
///
/// `claim` may hold an RFC 3339 string or epoch seconds; `exp` is the
/// fallback. A missing or malformed value yields `None`.
pub fn claim_expiry(claims: &Claims, claim: &str) -> Option<DateTime<Utc>> {
    claims
        .get(claim)
        .or_else(|| claims.get("exp"))
        .and_then(parse_instant)
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(number) => Utc.timestamp_opt(number.as_i64()?, 0).single(),
        _ => None,
    }
}
