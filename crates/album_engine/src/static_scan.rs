use std::sync::Arc;

use album_core::{ExtractError, LinkSet, RetryPolicy};
use album_logging::album_info;

use crate::discover::LinkDiscovery;
use crate::fetch::{fetch_with_retry, DocumentFetcher};

/// Legacy discovery: one static fetch of the album page, no scrolling.
///
/// Only the links present in the first server-rendered page are found.
pub struct StaticLinkScanner {
    fetcher: Arc<dyn DocumentFetcher>,
    discovery: Arc<LinkDiscovery>,
    retry: RetryPolicy,
}

impl StaticLinkScanner {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        discovery: Arc<LinkDiscovery>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            discovery,
            retry,
        }
    }

    pub async fn scan(
        &self,
        album_url: &str,
        max_count: Option<usize>,
    ) -> Result<Vec<String>, ExtractError> {
        let html = fetch_with_retry(self.fetcher.as_ref(), album_url, &self.retry)
            .await
            .map_err(|reason| reason.into_extract_error(album_url))?;

        let mut links = LinkSet::new();
        links.extend(self.discovery.discover(&html));
        album_info!("static scan of {} found {} links", album_url, links.len());
        Ok(links.into_truncated(max_count))
    }
}
