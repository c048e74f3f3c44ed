use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use step_agent::Perception;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The browser process or its control channel is gone.
    #[error("browser unreachable: {0}")]
    Unreachable(String),
    #[error("element {index} not found on the current page")]
    ElementNotFound { index: usize },
    #[error("element {index} is not an input field")]
    NotEditable { index: usize },
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// What visibly changed after a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    Navigated { url: String },
    ContentChanged,
    NoVisibleChange,
}

impl fmt::Display for ClickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigated { url } => write!(f, "Page navigated to {url}"),
            Self::ContentChanged => f.write_str("Page content changed"),
            Self::NoVisibleChange => {
                f.write_str("no obvious changes detected (may still have worked)")
            }
        }
    }
}

/// Primitive operations of a browser session.
///
/// `observe` rebuilds the indexed element list; every index-taking method
/// resolves indexes against the list returned by the most recent `observe`.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn observe(&self) -> Result<Perception, DriverError>;
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;
    async fn click(&self, index: usize) -> Result<ClickOutcome, DriverError>;
    async fn input_text(&self, index: usize, text: &str) -> Result<(), DriverError>;
    async fn send_keys(&self, keys: &str) -> Result<(), DriverError>;
    async fn scroll(&self, down: bool, pages: f64) -> Result<(), DriverError>;
    /// Base64-encoded PNG of the viewport.
    async fn screenshot(&self) -> Result<String, DriverError>;
    /// Readable text of the current page.
    async fn page_content(&self) -> Result<String, DriverError>;
}
