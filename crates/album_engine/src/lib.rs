//! Album engine: fetching, parsing, conversion, link harvesting and batch extraction.
mod browser;
mod chromium;
mod discover;
mod export;
mod extractor;
mod fetch;
mod harvest;
mod images;
mod markdown;
mod orchestrator;
mod pacing;
mod parse;
mod static_scan;
mod types;
mod user_agent;

pub use browser::{
    evaluate_as, BrowserError, BrowserLauncher, BrowserSession, UnavailableLauncher, WaitPolicy,
};
pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use discover::{sweep_markup, LinkDiscovery};
pub use export::{article_filename, sanitize_filename, ExportError, ExportSummary, MarkdownExporter};
pub use extractor::AlbumExtractor;
pub use fetch::{fetch_with_retry, DocumentFetcher, ReqwestFetcher};
pub use harvest::{HarvestOutcome, LinkHarvester, SNAPSHOT_SCRIPT};
pub use images::{AttributeSource, ImagePolicy};
pub use markdown::{compose_header, MarkdownConverter};
pub use orchestrator::{ArticleOutcome, BatchOrchestrator, BatchReport};
pub use parse::{
    script_timestamp, select_attr, select_cleaned_html, select_text, ContentParser,
    ParseError, ParsedArticle, Strategy, StrategyChain,
};
pub use static_scan::StaticLinkScanner;
pub use types::{EngineEvent, NoopProgressSink, ProgressSink};
pub use user_agent::{UserAgentRotator, DEFAULT_USER_AGENTS};
