use std::sync::Arc;

use album_core::{ArticleRecord, BatchSettings, RetryPolicy, SkipReason};
use album_logging::{album_debug, album_info, album_warn};
use futures_util::future::join_all;

use crate::fetch::{fetch_with_retry, DocumentFetcher};
use crate::markdown::MarkdownConverter;
use crate::pacing::{jitter, pause};
use crate::parse::{ContentParser, ParseError};
use crate::types::{EngineEvent, ProgressSink};

/// Outcome of one link in a batch run, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Extracted(ArticleRecord),
    Skipped { url: String, reason: SkipReason },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<ArticleOutcome>,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ArticleOutcome::Extracted(record) => Some(record),
            ArticleOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ArticleOutcome::Skipped { url, reason } => Some((url.as_str(), reason)),
            ArticleOutcome::Extracted(_) => None,
        })
    }

    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                ArticleOutcome::Extracted(record) => Some(record),
                ArticleOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}

/// Extracts articles in fixed-size concurrent windows.
///
/// Windows run strictly one after another with a pause between them; inside
/// a window every unit waits a random delay before its first request. A
/// failing unit is skipped and never aborts the batch.
pub struct BatchOrchestrator {
    fetcher: Arc<dyn DocumentFetcher>,
    parser: Arc<ContentParser>,
    converter: MarkdownConverter,
    batch: BatchSettings,
    retry: RetryPolicy,
}

impl BatchOrchestrator {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        parser: Arc<ContentParser>,
        converter: MarkdownConverter,
        batch: BatchSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            parser,
            converter,
            batch,
            retry,
        }
    }

    /// Fetch, parse and convert one article.
    pub async fn extract_one(&self, url: &str) -> Result<ArticleRecord, SkipReason> {
        let html = fetch_with_retry(self.fetcher.as_ref(), url, &self.retry).await?;
        let parsed = self.parser.parse(&html).map_err(|err| match err {
            ParseError::ContentNotFound => SkipReason::ContentNotFound,
        })?;
        let content = self.converter.convert(
            &parsed.body_html,
            &parsed.title,
            parsed.author.as_deref(),
            parsed.publish_time.as_deref(),
        );
        Ok(ArticleRecord {
            title: parsed.title,
            content,
            author: parsed.author,
            publish_time: parsed.publish_time,
            url: url.to_string(),
            images: parsed.images,
        })
    }

    pub async fn extract_all(&self, links: &[String], sink: &dyn ProgressSink) -> Vec<ArticleRecord> {
        self.extract_all_with_report(links, sink)
            .await
            .into_records()
    }

    pub async fn extract_all_with_report(
        &self,
        links: &[String],
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        let window_size = self.batch.batch_size.max(1);
        let total_windows = links.len().div_ceil(window_size);
        let mut report = BatchReport::default();

        for (window_index, window) in links.chunks(window_size).enumerate() {
            sink.emit(EngineEvent::BatchStarted {
                index: window_index + 1,
                total: total_windows,
                size: window.len(),
            });
            album_info!(
                "batch {}/{}: {} articles",
                window_index + 1,
                total_windows,
                window.len()
            );

            let offset = window_index * window_size;
            let units = window
                .iter()
                .enumerate()
                .map(|(i, url)| self.run_unit(offset + i + 1, url));
            let results = join_all(units).await;

            for (i, (url, result)) in window.iter().zip(results).enumerate() {
                let index = offset + i + 1;
                match result {
                    Ok(record) => {
                        sink.emit(EngineEvent::ArticleExtracted {
                            index,
                            url: url.clone(),
                            title: record.title.clone(),
                        });
                        report.outcomes.push(ArticleOutcome::Extracted(record));
                    }
                    Err(reason) => {
                        album_warn!("skipping article {} ({}): {}", index, url, reason);
                        sink.emit(EngineEvent::ArticleSkipped {
                            index,
                            url: url.clone(),
                            reason: reason.clone(),
                        });
                        report.outcomes.push(ArticleOutcome::Skipped {
                            url: url.clone(),
                            reason,
                        });
                    }
                }
            }

            if window_index + 1 < total_windows {
                pause(self.batch.window_pause()).await;
            }
        }

        let extracted = report.records().count();
        let skipped = report.outcomes.len() - extracted;
        album_info!("batch run finished: {} extracted, {} skipped", extracted, skipped);
        sink.emit(EngineEvent::Finished { extracted, skipped });
        report
    }

    async fn run_unit(&self, index: usize, url: &str) -> Result<ArticleRecord, SkipReason> {
        pause(jitter(self.batch.unit_delay_min_ms, self.batch.unit_delay_max_ms)).await;
        album_debug!("extracting article {}: {}", index, url);
        self.extract_one(url).await
    }
}
