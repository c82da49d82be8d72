//! Types
//!
//! Data model shared by the transport and the token engine.

pub mod auth;
pub mod call;
pub mod callback;
pub mod config;
pub mod oauth;
pub mod token;

pub use auth::*;
pub use call::*;
pub use callback::*;
pub use config::*;
pub use oauth::*;
pub use token::*;
