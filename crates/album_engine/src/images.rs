//! Image source selection shared by the parser and the Markdown converter.

use album_core::IMAGE_CDN_HOST;
use url::Url;

/// Minimal view of a markup node: attribute lookup by name.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl AttributeSource for scraper::node::Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attr(name)
    }
}

impl AttributeSource for scraper::ElementRef<'_> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

/// Lazy-loading attributes, most preferred first.
const DEFERRED_ATTRIBUTES: &[&str] = &["data-src", "data-original"];
/// Tokens marking spinner or placeholder artwork.
const PLACEHOLDER_TOKENS: &[&str] = &["placeholder", "loading"];
/// Inline encodings used for lazy-load placeholders and 1×1 tracking pixels.
const INLINE_PLACEHOLDERS: &[&str] = &["data:image/svg+xml", "data:image/gif;base64,R0lGODlhAQAB"];

/// Decides which image URL, if any, a node contributes.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    cdn_host: String,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::for_host(IMAGE_CDN_HOST)
    }
}

impl ImagePolicy {
    pub fn for_host(cdn_host: impl Into<String>) -> Self {
        Self {
            cdn_host: cdn_host.into(),
        }
    }

    /// Returns the accepted, https-normalized image URL for `node`.
    ///
    /// A deferred-load attribute wins over `src`. Inline data URIs, placeholder
    /// artwork and hosts other than the image CDN are rejected.
    pub fn resolve(&self, node: &dyn AttributeSource) -> Option<String> {
        let candidate = DEFERRED_ATTRIBUTES
            .iter()
            .chain(std::iter::once(&"src"))
            .filter_map(|name| node.attribute(name))
            .map(str::trim)
            .find(|value| !value.is_empty())?;

        if INLINE_PLACEHOLDERS
            .iter()
            .any(|prefix| candidate.starts_with(prefix))
            || candidate.starts_with("data:")
        {
            return None;
        }
        let lower = candidate.to_ascii_lowercase();
        if PLACEHOLDER_TOKENS.iter().any(|token| lower.contains(token)) {
            return None;
        }

        let secure = if let Some(rest) = candidate.strip_prefix("//") {
            format!("https://{rest}")
        } else if let Some(rest) = candidate.strip_prefix("http://") {
            format!("https://{rest}")
        } else {
            candidate.to_string()
        };

        let parsed = Url::parse(&secure).ok()?;
        if parsed.scheme() != "https" || parsed.host_str() != Some(self.cdn_host.as_str()) {
            return None;
        }
        Some(secure)
    }
}
