use album_core::{SkipReason, StopReason};

/// Progress notifications emitted while an extraction runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One harvesting round finished.
    HarvestRound {
        round: u32,
        discovered: usize,
        new_links: usize,
    },
    HarvestStopped {
        rounds: u32,
        reason: StopReason,
    },
    /// Link discovery finished with `count` links to extract.
    LinksDiscovered { count: usize },
    /// A batch window of `size` links started (1-based `index` of `total`).
    BatchStarted {
        index: usize,
        total: usize,
        size: usize,
    },
    ArticleExtracted {
        index: usize,
        url: String,
        title: String,
    },
    ArticleSkipped {
        index: usize,
        url: String,
        reason: SkipReason,
    },
    Finished { extracted: usize, skipped: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}
