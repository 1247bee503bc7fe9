//! Browser-runtime capability used by the link harvester.
//!
//! The harvester only sees [`BrowserLauncher`] and [`BrowserSession`]. Backends
//! decide how a browser is found or started; the chromiumoxide backend lives in
//! [`crate::chromium`], and [`UnavailableLauncher`] stands in when no browser
//! should ever be used.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser unavailable: {0}")]
    Unavailable(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("script evaluation failed: {0}")]
    Script(String),
}

/// How long `navigate` waits before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Return once the load event fired.
    Load,
    /// Additionally wait for network activity to quiesce.
    NetworkIdle,
}

/// One page in a running browser.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<(), BrowserError>;

    /// Evaluates `script` in the page and returns its JSON-serializable result.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Typed wrapper around [`BrowserSession::evaluate`].
pub async fn evaluate_as<T: DeserializeOwned>(
    session: &mut dyn BrowserSession,
    script: &str,
) -> Result<T, BrowserError> {
    let value = session.evaluate(script).await?;
    serde_json::from_value(value).map_err(|err| BrowserError::Script(err.to_string()))
}

/// Creates browser sessions.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Launcher that never produces a session.
#[derive(Debug, Clone)]
pub struct UnavailableLauncher {
    reason: String,
}

impl UnavailableLauncher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableLauncher {
    fn default() -> Self {
        Self::new("no browser backend configured")
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for UnavailableLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Err(BrowserError::Unavailable(self.reason.clone()))
    }
}
