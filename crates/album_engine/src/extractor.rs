use std::sync::Arc;

use album_core::{
    ArticleRecord, ExtractError, ExtractionRequest, ExtractorConfig, HarvestMode, RequestKind,
};
use album_logging::{album_error, album_info};

use crate::browser::BrowserLauncher;
use crate::discover::LinkDiscovery;
use crate::fetch::{DocumentFetcher, ReqwestFetcher};
use crate::harvest::LinkHarvester;
use crate::markdown::MarkdownConverter;
use crate::orchestrator::{ArticleOutcome, BatchOrchestrator, BatchReport};
use crate::parse::ContentParser;
use crate::static_scan::StaticLinkScanner;
use crate::types::{EngineEvent, ProgressSink};

/// Entry point: validates a request and routes it to single-article
/// extraction or album discovery plus batch extraction.
pub struct AlbumExtractor {
    harvester: LinkHarvester,
    scanner: StaticLinkScanner,
    orchestrator: BatchOrchestrator,
}

impl AlbumExtractor {
    /// Builds the HTTP fetcher from `config.fetch`.
    pub fn new(
        config: ExtractorConfig,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self, ExtractError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), launcher))
    }

    pub fn with_fetcher(
        config: ExtractorConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let discovery = Arc::new(LinkDiscovery::new());
        let harvester = LinkHarvester::new(launcher, config.harvest.clone(), discovery.clone());
        let scanner = StaticLinkScanner::new(fetcher.clone(), discovery, config.retry);
        let orchestrator = BatchOrchestrator::new(
            fetcher,
            Arc::new(ContentParser::platform()),
            MarkdownConverter::default(),
            config.batch.clone(),
            config.retry,
        );
        Self {
            harvester,
            scanner,
            orchestrator,
        }
    }

    /// Extracted articles in link order; skipped articles are dropped.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<ArticleRecord>, ExtractError> {
        Ok(self.extract_with_report(request, sink).await?.into_records())
    }

    pub async fn extract_with_report(
        &self,
        request: &ExtractionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport, ExtractError> {
        let url = request.target_url.trim();
        match request.validate()? {
            RequestKind::Article => {
                let record = self.extract_single(url).await?;
                sink.emit(EngineEvent::ArticleExtracted {
                    index: 1,
                    url: url.to_string(),
                    title: record.title.clone(),
                });
                sink.emit(EngineEvent::Finished {
                    extracted: 1,
                    skipped: 0,
                });
                Ok(BatchReport {
                    outcomes: vec![ArticleOutcome::Extracted(record)],
                })
            }
            RequestKind::Album => {
                let links = self
                    .discover_links(url, request.max_count, request.mode, sink)
                    .await?;
                Ok(self
                    .orchestrator
                    .extract_all_with_report(&links, sink)
                    .await)
            }
        }
    }

    /// Single-article request: failures surface as errors instead of skips.
    pub async fn extract_single(&self, url: &str) -> Result<ArticleRecord, ExtractError> {
        self.orchestrator
            .extract_one(url)
            .await
            .map_err(|reason| reason.into_extract_error(url))
    }

    /// Finds the album's article links with the requested discovery mode.
    ///
    /// Browser mode never falls back to a static scan.
    pub async fn discover_links(
        &self,
        album_url: &str,
        max_count: Option<usize>,
        mode: HarvestMode,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<String>, ExtractError> {
        let links = match mode {
            HarvestMode::Browser => {
                self.harvester
                    .harvest(album_url, max_count, sink)
                    .await?
                    .links
            }
            HarvestMode::Static => self.scanner.scan(album_url, max_count).await?,
        };

        if links.is_empty() {
            album_error!("no article links found at {}", album_url);
            return Err(ExtractError::LinkDiscoveryEmpty {
                url: album_url.to_string(),
            });
        }
        album_info!("discovered {} article links at {}", links.len(), album_url);
        sink.emit(EngineEvent::LinksDiscovered { count: links.len() });
        Ok(links)
    }
}
