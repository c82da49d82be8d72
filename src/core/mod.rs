//! Core Components
//!
//! Transport seam, URL and merge helpers, downloads and the web-grant
//! collaborators.

pub mod browser;
pub mod download;
pub mod listener;
pub mod merge;
pub mod state;
pub mod transport;
pub mod uri;

pub use browser::*;
pub use download::*;
pub use listener::*;
pub use merge::*;
pub use state::*;
pub use transport::*;
pub use uri::*;
