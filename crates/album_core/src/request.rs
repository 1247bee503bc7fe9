use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::platform::{is_album_url, is_platform_url, PLATFORM_HOST};

/// How album links are discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarvestMode {
    /// Drive a headless browser and scroll until the link set converges.
    #[default]
    Browser,
    /// Scan a single static fetch of the album page.
    Static,
}

/// What the target URL refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Article,
    Album,
}

/// Caller-supplied extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    #[serde(rename = "url")]
    pub target_url: String,
    #[serde(default)]
    pub max_count: Option<usize>,
    #[serde(default)]
    pub mode: HarvestMode,
}

impl ExtractionRequest {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            max_count: None,
            mode: HarvestMode::default(),
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_mode(mut self, mode: HarvestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn kind(&self) -> RequestKind {
        if is_album_url(self.target_url.trim()) {
            RequestKind::Album
        } else {
            RequestKind::Article
        }
    }

    /// Boundary validation: the URL must be on the platform host and
    /// `max_count`, when present, must be positive.
    pub fn validate(&self) -> Result<RequestKind, ExtractError> {
        let url = self.target_url.trim();
        if url.is_empty() {
            return Err(ExtractError::Validation("a URL is required".into()));
        }
        if !is_platform_url(url) {
            return Err(ExtractError::Validation(format!(
                "{url} is not a {PLATFORM_HOST} article or album URL"
            )));
        }
        if self.max_count == Some(0) {
            return Err(ExtractError::Validation(
                "max count must be a positive integer".into(),
            ));
        }
        Ok(self.kind())
    }
}
