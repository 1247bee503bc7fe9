use std::sync::Arc;

use album_core::{
    ExtractError, FetchError, HarvestProgress, HarvestSettings, LinkSet, NetworkErrorKind,
    RoundDecision, StopReason,
};
use album_logging::{album_debug, album_info, album_warn};

use crate::browser::{evaluate_as, BrowserError, BrowserLauncher, BrowserSession, WaitPolicy};
use crate::discover::LinkDiscovery;
use crate::pacing::{jitter, pause};
use crate::types::{EngineEvent, ProgressSink};

/// Returns the current rendered markup of the page.
pub const SNAPSHOT_SCRIPT: &str = "document.documentElement.outerHTML";

/// Result of one harvesting session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Discovered article links, truncated to the requested count.
    pub links: Vec<String>,
    pub rounds: u32,
    pub stop_reason: StopReason,
}

/// Discovers album links by repeatedly scrolling a browser page.
pub struct LinkHarvester {
    launcher: Arc<dyn BrowserLauncher>,
    settings: HarvestSettings,
    discovery: Arc<LinkDiscovery>,
}

impl LinkHarvester {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        settings: HarvestSettings,
        discovery: Arc<LinkDiscovery>,
    ) -> Self {
        Self {
            launcher,
            settings,
            discovery,
        }
    }

    pub async fn harvest(
        &self,
        album_url: &str,
        max_count: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestOutcome, ExtractError> {
        let mut session = self.launcher.launch().await.map_err(|err| match err {
            BrowserError::Unavailable(reason) => ExtractError::BrowserUnavailable(reason),
            other => ExtractError::BrowserUnavailable(other.to_string()),
        })?;

        let outcome = self
            .drive(session.as_mut(), album_url, max_count, sink)
            .await;
        if let Err(err) = session.close().await {
            album_warn!("failed to close browser session: {}", err);
        }
        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        album_url: &str,
        max_count: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestOutcome, ExtractError> {
        session
            .navigate(album_url, WaitPolicy::NetworkIdle)
            .await
            .map_err(|err| {
                ExtractError::Network(FetchError::new(NetworkErrorKind::Other, err.to_string()))
            })?;
        pause(self.settings.settle_delay()).await;

        let mut links = LinkSet::new();
        let mut progress = HarvestProgress::new(&self.settings, max_count);

        let stop_reason = loop {
            let added = match evaluate_as::<String>(session, SNAPSHOT_SCRIPT).await {
                Ok(markup) => links.extend(self.discovery.discover(&markup)),
                Err(err) => {
                    album_warn!("snapshot failed in round {}: {}", progress.rounds() + 1, err);
                    0
                }
            };
            let decision = progress.observe(added, links.len());
            album_debug!(
                "harvest round {}: {} new, {} total",
                progress.rounds(),
                added,
                links.len()
            );
            sink.emit(EngineEvent::HarvestRound {
                round: progress.rounds(),
                discovered: links.len(),
                new_links: added,
            });

            match decision {
                RoundDecision::Stop(reason) => break reason,
                RoundDecision::Continue => {
                    if let Err(err) = session.scroll_to_bottom().await {
                        album_warn!("scroll failed: {}", err);
                    }
                    pause(jitter(
                        self.settings.scroll_pause_min_ms,
                        self.settings.scroll_pause_max_ms,
                    ))
                    .await;
                }
            }
        };

        album_info!(
            "harvest of {} stopped after {} rounds ({:?}) with {} links",
            album_url,
            progress.rounds(),
            stop_reason,
            links.len()
        );
        sink.emit(EngineEvent::HarvestStopped {
            rounds: progress.rounds(),
            reason: stop_reason,
        });

        Ok(HarvestOutcome {
            links: links.into_truncated(max_count),
            rounds: progress.rounds(),
            stop_reason,
        })
    }
}
