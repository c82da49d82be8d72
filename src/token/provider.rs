//! Token Provider
//!
//! Seam between the transport and whatever produces bearer credentials.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{RestError, RestResult};
use crate::types::RefreshMode;

/// Source of `Authorization` header values for oauth2 calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return `"Bearer <token>"` for `scope` (provider default when `None`).
    async fn obtain(&self, scope: Option<&str>, mode: RefreshMode) -> RestResult<String>;
}

/// Mock token provider for testing.
#[derive(Default)]
pub struct MockTokenProvider {
    responses: Mutex<VecDeque<RestResult<String>>>,
    history: Mutex<Vec<(Option<String>, RefreshMode)>>,
}

impl MockTokenProvider {
    /// Create new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a credential.
    pub fn queue_token(&self, token: &str) -> &Self {
        lock(&self.responses).push_back(Ok(format!("Bearer {}", token)));
        self
    }

    /// Queue a failure.
    pub fn queue_error(&self, error: RestError) -> &Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// (scope, mode) of every obtain call.
    pub fn get_history(&self) -> Vec<(Option<String>, RefreshMode)> {
        lock(&self.history).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn obtain(&self, scope: Option<&str>, mode: RefreshMode) -> RestResult<String> {
        lock(&self.history).push((scope.map(str::to_string), mode));
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(RestError::Protocol(crate::error::ProtocolError::InvalidResponse {
                message: "no mock token queued".to_string(),
            }))
        })
    }
}
