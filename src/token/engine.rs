//! OAuth Token Engine
//!
//! Turns one OAuth parameter set into bearer credentials: cache lookup,
//! preemptive refresh from the decoded expiry, reactive refresh on request,
//! and the configured grant as the last resort.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{claim_expiry, fingerprint, DecoderRegistry, TokenCache, TokenProvider, TOKEN_CATEGORY};
use crate::client::RestClient;
use crate::core::{BrowserLauncher, CallbackListener, LocalCallbackListener, SystemBrowser};
use crate::error::{ProtocolError, RestError, RestResult};
use crate::flows::{refresh_grant, run_grant, GrantContext};
use crate::types::{
    AuthConfig, CallResult, EngineConfig, OAuthParams, RefreshMode, TokenRecord, TransportConfig,
};

/// Token engine bound to one OAuth parameter set.
pub struct OAuthEngine {
    params: OAuthParams,
    api: RestClient,
    cache: Arc<dyn TokenCache>,
    decoders: Arc<DecoderRegistry>,
    browser: Arc<dyn BrowserLauncher>,
    listener: Arc<dyn CallbackListener>,
    config: EngineConfig,
    // One token acquisition at a time per engine.
    gate: tokio::sync::Mutex<()>,
}

impl OAuthEngine {
    /// Create an engine talking to `params.base_url` through a new client.
    ///
    /// Stale cache entries are purged before the engine is returned.
    pub async fn new(
        params: OAuthParams,
        cache: Arc<dyn TokenCache>,
        transport: Arc<TransportConfig>,
    ) -> RestResult<Self> {
        let api = RestClient::new(params.base_url.clone(), AuthConfig::None, transport)?;
        Self::with_client(params, api, cache, EngineConfig::default()).await
    }

    /// Create an engine with a caller-built client for the authorization server.
    pub async fn with_client(
        params: OAuthParams,
        api: RestClient,
        cache: Arc<dyn TokenCache>,
        config: EngineConfig,
    ) -> RestResult<Self> {
        let removed = cache
            .garbage_collect(TOKEN_CATEGORY, config.cache_max_age)
            .await?;
        if removed > 0 {
            debug!(removed, "Purged stale token records");
        }

        Ok(Self {
            params,
            api,
            cache,
            decoders: Arc::new(DecoderRegistry::with_defaults()),
            browser: Arc::new(SystemBrowser),
            listener: Arc::new(LocalCallbackListener),
            config,
            gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Share a decoder registry, e.g. one with backend-specific decoders.
    pub fn with_decoders(mut self, decoders: Arc<DecoderRegistry>) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CallbackListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn params(&self) -> &OAuthParams {
        &self.params
    }

    pub fn decoders(&self) -> &Arc<DecoderRegistry> {
        &self.decoders
    }

    /// Cached record for `scope`, if any. Undecodable entries count as absent.
    async fn load(&self, key: &str) -> RestResult<Option<TokenRecord>> {
        let Some(json) = self.cache.get(key).await? else {
            debug!(key = %key, "Token cache miss");
            return Ok(None);
        };
        match TokenRecord::from_json(&json) {
            Ok(record) => {
                debug!(key = %key, "Token cache hit");
                Ok(Some(record))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring corrupted token record");
                Ok(None)
            }
        }
    }

    /// True when the decoded expiry is inside the refresh window.
    fn expires_soon(&self, record: &TokenRecord) -> bool {
        let Some(token) = record.field(&self.params.token_field) else {
            return false;
        };
        let Some(expiry) = self
            .decoders
            .decode(token)
            .and_then(|claims| claim_expiry(&claims, &self.params.expiry_claim))
        else {
            return false;
        };

        match (expiry - Utc::now()).to_std() {
            Ok(remaining) => remaining < self.config.refresh_window,
            Err(_) => true,
        }
    }

    /// Validate a token endpoint result as a record carrying the token field.
    fn record_from(&self, result: &CallResult) -> RestResult<TokenRecord> {
        let record = result
            .json()
            .cloned()
            .and_then(TokenRecord::from_value)
            .ok_or_else(|| {
                RestError::Protocol(ProtocolError::InvalidResponse {
                    message: format!(
                        "token endpoint returned no JSON object (status {})",
                        result.status()
                    ),
                })
            })?;
        if record.field(&self.params.token_field).is_none() {
            return Err(RestError::Protocol(ProtocolError::MissingField {
                field: self.params.token_field.clone(),
            }));
        }
        Ok(record)
    }

    /// Refresh exchange. `None` when it failed; the entry is gone then.
    async fn refresh(
        &self,
        key: &str,
        scope: Option<&str>,
        refresh_token: &str,
    ) -> RestResult<Option<TokenRecord>> {
        info!(grant = self.params.grant.name(), "Refreshing token");
        let outcome = match refresh_grant(&self.api, &self.params, scope, refresh_token).await {
            Ok(result) => self.record_from(&result),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(record) => {
                let record = record.with_preserved_refresh_token(Some(refresh_token));
                self.cache.put(key, &record.to_json()).await?;
                Ok(Some(record))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, falling back to full grant");
                self.cache.delete(key).await?;
                Ok(None)
            }
        }
    }

    /// Run the configured grant and persist its record.
    async fn create(&self, key: &str, scope: Option<&str>) -> RestResult<TokenRecord> {
        info!(grant = self.params.grant.name(), scope = ?scope, "Running grant");
        let ctx = GrantContext {
            api: &self.api,
            params: &self.params,
            scope,
            config: &self.config,
            browser: self.browser.as_ref(),
            listener: self.listener.as_ref(),
        };
        let result = run_grant(&ctx).await?;
        let record = self.record_from(&result)?;
        self.cache.put(key, &record.to_json()).await?;
        Ok(record)
    }
}

#[async_trait]
impl TokenProvider for OAuthEngine {
    async fn obtain(&self, scope: Option<&str>, mode: RefreshMode) -> RestResult<String> {
        let _guard = self.gate.lock().await;
        let scope = scope.or(self.params.scope.as_deref());
        let key = fingerprint(scope, &self.params)?;

        let cached = if mode == RefreshMode::Reauthenticate {
            debug!(key = %key, "Forced re-authentication");
            self.cache.delete(&key).await?;
            None
        } else {
            self.load(&key).await?
        };

        let usable = match cached {
            Some(record) => {
                let mut refresh = mode == RefreshMode::Refresh;
                if !refresh && self.expires_soon(&record) {
                    debug!(key = %key, "Token expires soon, refreshing preemptively");
                    refresh = true;
                }
                if !refresh {
                    Some(record)
                } else if let Some(refresh_token) = record.refresh_token() {
                    self.refresh(&key, scope, refresh_token).await?
                } else {
                    None
                }
            }
            None => None,
        };

        let record = match usable {
            Some(record) => record,
            None => self.create(&key, scope).await?,
        };

        let token = record.field(&self.params.token_field).ok_or_else(|| {
            RestError::Protocol(ProtocolError::MissingField {
                field: self.params.token_field.clone(),
            })
        })?;
        Ok(format!("Bearer {}", token))
    }
}

impl std::fmt::Debug for OAuthEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthEngine")
            .field("params", &self.params)
            .field("api", &self.api)
            .field("decoders", &self.decoders)
            .field("config", &self.config)
            .finish()
    }
}
