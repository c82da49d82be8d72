//! Transport Configuration Builder
//!
//! Fluent builder for [`TransportConfig`], optionally seeded from the
//! environment.

use std::sync::Arc;
use std::time::Duration;

use crate::classify::{ErrorHandler, ErrorPipeline};
use crate::core::DownloadProgress;
use crate::error::{ConfigurationError, RestError, RestResult};
use crate::types::TransportConfig;

/// Disable TLS certificate verification when truthy.
pub const ENV_INSECURE: &str = "ASPERA_REST_INSECURE";
/// Override the `User-Agent` header.
pub const ENV_USER_AGENT: &str = "ASPERA_REST_USER_AGENT";
/// Whole-request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "ASPERA_REST_TIMEOUT_SECS";

/// Transport configuration builder.
#[derive(Debug, Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Create new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ASPERA_REST_INSECURE`: `true`/`1`/`yes` disables certificate checks
    /// - `ASPERA_REST_USER_AGENT`: custom user agent
    /// - `ASPERA_REST_TIMEOUT_SECS`: request timeout in seconds
    pub fn from_env() -> RestResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> RestResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();

        if let Some(value) = lookup(ENV_INSECURE) {
            let insecure = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid(ENV_INSECURE, &value)),
            };
            builder = builder.verify_tls(!insecure);
        }

        if let Some(user_agent) = lookup(ENV_USER_AGENT).filter(|ua| !ua.is_empty()) {
            builder = builder.user_agent(user_agent);
        }

        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            let seconds: u64 = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_TIMEOUT_SECS, &value))?;
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(builder)
    }

    /// Enable or disable TLS certificate verification.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Customize the reqwest client before it is built.
    pub fn session_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync + 'static,
    {
        self.config.session_hook = Some(Arc::new(hook));
        self
    }

    /// Statuses that trigger refresh and re-authentication for oauth2 calls.
    pub fn not_authenticated_codes(mut self, codes: Vec<u16>) -> Self {
        self.config.not_authenticated_codes = codes;
        self
    }

    pub fn partial_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.partial_suffix = suffix.into();
        self
    }

    /// Set download progress observer.
    pub fn progress(mut self, progress: Arc<dyn DownloadProgress>) -> Self {
        self.config.progress = Some(progress);
        self
    }

    /// Replace the error pipeline.
    pub fn pipeline(mut self, pipeline: ErrorPipeline) -> Self {
        self.config.pipeline = pipeline;
        self
    }

    /// Register an error handler, evaluated before those registered earlier.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.config.pipeline.register(handler);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TransportConfig {
        self.config
    }

    /// Build the configuration ready to share between clients.
    pub fn build_shared(self) -> Arc<TransportConfig> {
        Arc::new(self.config)
    }
}

fn invalid(name: &str, value: &str) -> RestError {
    RestError::Configuration(ConfigurationError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Create a new transport configuration builder.
pub fn transport_config() -> TransportConfigBuilder {
    TransportConfigBuilder::new()
}
