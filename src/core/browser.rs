//! Browser Launcher
//!
//! Opens the authorization URL for the web grant.

use std::sync::Mutex;
use tracing::{info, warn};

/// System browser launcher interface (for dependency injection).
///
/// Opening is best-effort and must not block until the page is closed.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, uri: &str);
}

/// Launcher using the platform opener (`open`, `xdg-open`, `start`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, uri: &str) {
        info!(uri = %uri, "Opening browser for authorization");

        #[cfg(target_os = "macos")]
        let spawned = std::process::Command::new("open").arg(uri).spawn();
        #[cfg(target_os = "windows")]
        let spawned = std::process::Command::new("cmd")
            .args(["/C", "start", "", uri])
            .spawn();
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let spawned = std::process::Command::new("xdg-open").arg(uri).spawn();

        if let Err(e) = spawned {
            // The user can still copy the URL from the log.
            warn!(error = %e, uri = %uri, "Could not launch browser");
        }
    }
}

/// Mock browser launcher for testing.
#[derive(Default)]
pub struct MockBrowserLauncher {
    opened: Mutex<Vec<String>>,
}

impl MockBrowserLauncher {
    /// Create new mock launcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// URIs opened so far.
    pub fn get_opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl BrowserLauncher for MockBrowserLauncher {
    fn open(&self, uri: &str) {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(uri.to_string());
    }
}
