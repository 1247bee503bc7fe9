//! Album harvester core: IO-free domain types, URL rules and pure state machines.
mod config;
mod convergence;
mod error;
mod link_set;
mod platform;
mod record;
mod request;
mod retry;

pub use config::{BatchSettings, ConfigError, ExtractorConfig, FetchSettings, HarvestSettings};
pub use convergence::{HarvestProgress, RoundDecision, StopReason};
pub use error::{ExtractError, FetchError, NetworkErrorKind, SkipReason};
pub use link_set::LinkSet;
pub use platform::{
    is_album_url, is_platform_url, normalize_article_url, ALBUM_MARKER,
    ARTICLE_ID_PARAM, ARTICLE_PATH, IMAGE_CDN_HOST, LANDING_PAGE_TITLE, PLATFORM_HOST,
    UNKNOWN_TITLE,
};
pub use record::ArticleRecord;
pub use request::{ExtractionRequest, HarvestMode, RequestKind};
pub use retry::{RetryPolicy, RetryState};
