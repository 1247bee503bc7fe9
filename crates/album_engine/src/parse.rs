//! Article field extraction via ordered strategy chains.
//!
//! Every field is described by a [`StrategyChain`]: an ordered list of pure
//! lookups over the parsed document. The first lookup that yields a non-empty
//! value accepted by the chain's validator wins. Platform markup changes are
//! handled by editing the chain definitions in [`ContentParser::platform`].

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use album_core::{LANDING_PAGE_TITLE, UNKNOWN_TITLE};
use album_logging::{album_debug, album_warn};
use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::images::ImagePolicy;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));
static SCRIPT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"var\s+ct\s*=\s*"(\d{9,11})""#).expect("valid regex")
});

/// Nodes removed from the body before it is serialized.
const BODY_CLEANUP: &[&str] = &[
    "script",
    "style",
    "noscript",
    ".qr-code",
    ".qr_code_pc",
    "#js_pc_qr_code",
    ".reward",
    ".reward_area",
    "#js_reward_area",
    ".share",
    ".js_share_area",
];

pub type Strategy = Box<dyn Fn(&Html) -> Option<String> + Send + Sync>;

/// Ordered fallback lookups for one field.
pub struct StrategyChain {
    name: &'static str,
    strategies: Vec<Strategy>,
    accept: fn(&str) -> bool,
}

impl StrategyChain {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            strategies: Vec::new(),
            accept: |_| true,
        }
    }

    /// Appends text lookups for each selector, in order.
    pub fn selectors(mut self, selectors: &[&str]) -> Self {
        for selector in selectors {
            self.strategies.push(select_text(selector));
        }
        self
    }

    pub fn then(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Sets the validator a candidate must pass in addition to being non-empty.
    pub fn accepting(mut self, accept: fn(&str) -> bool) -> Self {
        self.accept = accept;
        self
    }

    pub fn evaluate(&self, doc: &Html) -> Option<String> {
        self.strategies
            .iter()
            .filter_map(|strategy| strategy(doc))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && (self.accept)(value.as_str()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn never() -> Strategy {
    Box::new(|_: &Html| None::<String>)
}

/// Text of the first element matching `selector`, whitespace collapsed.
pub fn select_text(selector: &str) -> Strategy {
    let Some(selector) = compile(selector) else {
        return never();
    };
    Box::new(move |doc: &Html| {
        doc.select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
    })
}

/// Attribute value of the first element matching `selector`.
pub fn select_attr(selector: &str, attribute: &'static str) -> Strategy {
    let Some(selector) = compile(selector) else {
        return never();
    };
    Box::new(move |doc: &Html| {
        doc.select(&selector)
            .next()
            .and_then(|element| element.value().attr(attribute))
            .map(collapse_whitespace)
    })
}

/// Inner markup of the first element matching `selector`, minus non-content nodes.
pub fn select_cleaned_html(selector: &str, cleanup: Arc<Vec<Selector>>) -> Strategy {
    let Some(selector) = compile(selector) else {
        return never();
    };
    Box::new(move |doc: &Html| {
        doc.select(&selector)
            .next()
            .map(|element| cleaned_inner_html(element, &cleanup))
    })
}

/// Offset of the platform's displayed publish times (China Standard Time).
const PLATFORM_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Publish time embedded as a unix timestamp in the page's inline scripts,
/// rendered in the platform's local time like the visible date.
pub fn script_timestamp() -> Strategy {
    Box::new(|doc: &Html| {
        let script = compile("script")?;
        let offset = FixedOffset::east_opt(PLATFORM_UTC_OFFSET_SECS)?;
        doc.select(&script).find_map(|element| {
            let text = element.text().collect::<String>();
            let secs = SCRIPT_TIMESTAMP.captures(&text)?.get(1)?.as_str().parse().ok()?;
            DateTime::<Utc>::from_timestamp(secs, 0)
                .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string())
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: String,
    pub body_html: String,
    pub author: Option<String>,
    pub publish_time: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("article body not found")]
    ContentNotFound,
}

pub struct ContentParser {
    title: StrategyChain,
    body: StrategyChain,
    author: StrategyChain,
    publish_time: StrategyChain,
    images: ImagePolicy,
}

impl ContentParser {
    /// Chains tuned for the platform's article markup, newest layout first.
    pub fn platform() -> Self {
        let cleanup: Arc<Vec<Selector>> =
            Arc::new(BODY_CLEANUP.iter().filter_map(|s| compile(s)).collect());

        let title = StrategyChain::new("title")
            .selectors(&["#activity-name", ".rich_media_title", "h1.title", "h1", ".article-title"])
            .then(select_attr(r#"meta[property="og:title"]"#, "content"))
            .then(select_text("title"))
            .accepting(|value| value != LANDING_PAGE_TITLE);

        let body = [
            "#js_content",
            ".rich_media_content",
            ".article-content",
            ".content",
            "article",
        ]
        .iter()
        .fold(StrategyChain::new("body"), |chain, selector| {
            chain.then(select_cleaned_html(selector, cleanup.clone()))
        });

        let author = StrategyChain::new("author")
            .then(select_text("#js_name"))
            .then(select_attr(r#"meta[name="author"]"#, "content"))
            .selectors(&[".rich_media_meta_text", ".author", ".article-author"]);

        let publish_time = StrategyChain::new("publish_time")
            .selectors(&["#publish_time", ".rich_media_meta_text", ".publish-time", ".article-time"])
            .then(script_timestamp())
            .accepting(|value| YEAR.is_match(value));

        Self::new(title, body, author, publish_time, ImagePolicy::default())
    }

    pub fn new(
        title: StrategyChain,
        body: StrategyChain,
        author: StrategyChain,
        publish_time: StrategyChain,
        images: ImagePolicy,
    ) -> Self {
        Self {
            title,
            body,
            author,
            publish_time,
            images,
        }
    }

    pub fn parse(&self, html: &str) -> Result<ParsedArticle, ParseError> {
        let doc = Html::parse_document(html);

        let body_html = self
            .body
            .evaluate(&doc)
            .ok_or(ParseError::ContentNotFound)?;
        let title = self
            .title
            .evaluate(&doc)
            .unwrap_or_else(|| {
                album_debug!("{} chain matched nothing", self.title.name());
                UNKNOWN_TITLE.to_string()
            });

        Ok(ParsedArticle {
            title,
            body_html,
            author: self.author.evaluate(&doc),
            publish_time: self.publish_time.evaluate(&doc),
            images: self.collect_images(&doc),
        })
    }

    fn collect_images(&self, doc: &Html) -> Vec<String> {
        let Some(img) = compile("img") else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        doc.select(&img)
            .filter_map(|element| self.images.resolve(&element))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::platform()
    }
}

fn compile(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(err) => {
            album_warn!("ignoring invalid selector {:?}: {}", selector, err);
            None
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cleaned_inner_html(element: ElementRef, cleanup: &[Selector]) -> String {
    let mut fragment = Html::parse_fragment(&element.inner_html());
    let doomed: Vec<_> = cleanup
        .iter()
        .flat_map(|selector| fragment.select(selector).map(|node| node.id()))
        .collect();
    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    fragment.root_element().inner_html()
}
