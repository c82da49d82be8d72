//! Configuration Types
//!
//! Transport policy and token engine tunables.

use std::sync::Arc;
use std::time::Duration;

use crate::classify::ErrorPipeline;
use crate::core::DownloadProgress;

/// Hook customizing the HTTP client before it is built (timeouts, pinning).
pub type SessionHook = Arc<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync>;

/// Transport configuration, shared by every client built from it.
pub struct TransportConfig {
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// `User-Agent` header.
    pub user_agent: String,
    /// Whole-request timeout. None means no deadline.
    pub timeout: Option<Duration>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Client initialization hook.
    pub session_hook: Option<SessionHook>,
    /// Statuses that trigger the oauth retry.
    pub not_authenticated_codes: Vec<u16>,
    /// Suffix of in-progress download files.
    pub partial_suffix: String,
    /// Download progress observer.
    pub progress: Option<Arc<dyn DownloadProgress>>,
    /// Error classification pipeline.
    pub pipeline: ErrorPipeline,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            user_agent: default_user_agent(),
            timeout: None,
            connect_timeout: Duration::from_secs(30),
            session_hook: None,
            not_authenticated_codes: vec![401],
            partial_suffix: ".download".to_string(),
            progress: None,
            pipeline: ErrorPipeline::new(),
        }
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("verify_tls", &self.verify_tls)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("session_hook", &self.session_hook.is_some())
            .field("not_authenticated_codes", &self.not_authenticated_codes)
            .field("partial_suffix", &self.partial_suffix)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("aspera-rest/{}", env!("CARGO_PKG_VERSION"))
}

/// Token engine tunables.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Refresh preemptively when the decoded expiry is closer than this.
    pub refresh_window: Duration,
    /// Cached records older than this are purged at engine construction.
    pub cache_max_age: Duration,
    /// JWT `nbf` back-dating.
    pub jwt_not_before_skew: Duration,
    /// JWT `exp` distance from now.
    pub jwt_lifetime: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_window: Duration::from_secs(3600),
            cache_max_age: Duration::from_secs(30 * 60),
            jwt_not_before_skew: Duration::from_secs(300),
            jwt_lifetime: Duration::from_secs(3600),
        }
    }
}
