use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Structural selectors for anchors that point at articles, album layouts first.
const LINK_SELECTORS: &[&str] = &[
    ".album__list-item a",
    ".album_item a",
    ".js_album_item a",
    ".appmsg_item a",
    ".article-item a",
    r#"a[href*="mp.weixin.qq.com/s"]"#,
    r#"a[href*="/s?"]"#,
    r#"a[href*="__biz="]"#,
    r#"li a[href*="s?"]"#,
    r#"div a[href*="s?"]"#,
];

/// Attributes some album layouts use instead of `href`.
const LINK_ATTRIBUTES: &[&str] = &["data-link", "data-url"];

static PLAIN_ARTICLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://mp\.weixin\.qq\.com/s\?[^"'\s<>\\]+"#).expect("valid regex")
});
/// Same shape as it appears inside JSON string literals (`\/` escaped slashes).
static ESCAPED_ARTICLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?:\\/\\/mp\.weixin\.qq\.com\\/s\?[^"'\s<>]+"#).expect("valid regex")
});

/// Finds candidate article links in a markup snapshot.
///
/// Candidates are returned raw and in document order (selectors, then
/// attribute fallbacks, then the markup sweep); normalization and
/// deduplication happen in [`album_core::LinkSet`].
pub struct LinkDiscovery {
    selectors: Vec<Selector>,
    attribute_selectors: Vec<(Selector, &'static str)>,
}

impl LinkDiscovery {
    pub fn new() -> Self {
        let selectors = LINK_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        let attribute_selectors = LINK_ATTRIBUTES
            .iter()
            .filter_map(|attr| {
                Selector::parse(&format!("[{attr}]"))
                    .ok()
                    .map(|selector| (selector, *attr))
            })
            .collect();
        Self {
            selectors,
            attribute_selectors,
        }
    }

    pub fn discover(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let mut candidates = Vec::new();

        for selector in &self.selectors {
            candidates.extend(
                doc.select(selector)
                    .filter_map(|element| element.value().attr("href"))
                    .map(str::to_string),
            );
        }
        for (selector, attr) in &self.attribute_selectors {
            candidates.extend(
                doc.select(selector)
                    .filter_map(|element| element.value().attr(attr))
                    .map(str::to_string),
            );
        }

        candidates.extend(sweep_markup(html));
        candidates
    }
}

impl Default for LinkDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw-markup sweep for article URLs hidden in scripts or minified attributes.
pub fn sweep_markup(html: &str) -> Vec<String> {
    let plain = PLAIN_ARTICLE_URL
        .find_iter(html)
        .map(|m| m.as_str().replace("&amp;", "&"));
    let escaped = ESCAPED_ARTICLE_URL.find_iter(html).map(|m| {
        m.as_str()
            .replace("\\/", "/")
            .replace("\\u0026", "&")
            .replace("&amp;", "&")
    });
    plain.chain(escaped).collect()
}
