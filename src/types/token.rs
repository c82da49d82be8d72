//! Token Types
//!
//! Cached token records and refresh hints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StorageError;

/// Token record as returned by the token endpoint.
///
/// The whole JSON object is kept so that backend-specific fields (expiry,
/// scope, token type) survive a cache round trip.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRecord(Map<String, Value>);

impl TokenRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from a decoded token-endpoint body; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Parse a cached record.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(|e| StorageError::CorruptedData {
            message: e.to_string(),
        })
    }

    /// Serialize for the cache.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// String field lookup.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.field("refresh_token").filter(|t| !t.is_empty())
    }

    /// Carry `previous` over when this record has no refresh token of its own.
    pub fn with_preserved_refresh_token(mut self, previous: Option<&str>) -> Self {
        if self.refresh_token().is_none() {
            if let Some(previous) = previous {
                self.0.insert(
                    "refresh_token".to_string(),
                    Value::String(previous.to_string()),
                );
            }
        }
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("fields", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Refresh hint passed to the token engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// Use the cached token unless it is about to expire.
    #[default]
    Cached,
    /// Refresh with the refresh token, falling back to a full grant.
    Refresh,
    /// Drop the cached record and run the full grant.
    Reauthenticate,
}
