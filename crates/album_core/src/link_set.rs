use std::collections::HashSet;

use crate::platform::normalize_article_url;

/// Deduplicated, insertion-ordered set of article URLs built during one
/// harvesting session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `raw` and appends it when it is a new article URL.
    ///
    /// Returns true only when the set grew.
    pub fn insert(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_article_url(raw) else {
            return false;
        };
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.ordered.push(url);
        true
    }

    /// Merges candidates in order and returns how many were new.
    pub fn extend<I, S>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.insert(candidate.as_ref()))
            .count()
    }

    pub fn contains(&self, raw: &str) -> bool {
        normalize_article_url(raw).is_some_and(|url| self.seen.contains(&url))
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    /// Consumes the set, keeping at most `max_count` links in discovery order.
    pub fn into_truncated(self, max_count: Option<usize>) -> Vec<String> {
        let mut links = self.ordered;
        if let Some(limit) = max_count {
            links.truncate(limit);
        }
        links
    }
}
