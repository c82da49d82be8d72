//! Builders
//!
//! Fluent builders for transport configuration and OAuth parameter sets.

pub mod oauth;
pub mod transport;

pub use oauth::{oauth_params, OAuthParamsBuilder};
pub use transport::{
    transport_config, TransportConfigBuilder, ENV_INSECURE, ENV_TIMEOUT_SECS, ENV_USER_AGENT,
};
