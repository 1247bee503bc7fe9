use std::path::PathBuf;

use album_core::{ExtractionRequest, ExtractorConfig, HarvestMode};
use album_logging::{LevelFilter, LogDestination};
use clap::{Parser, ValueEnum};

/// Extract articles or whole albums from mp.weixin.qq.com as Markdown.
#[derive(Parser, Debug)]
#[command(name = "album-harvester", version)]
pub struct Cli {
    /// Article URL or album URL (containing `appmsgalbum`)
    pub url: String,

    /// Stop discovering album links once this many are known
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_count: Option<u64>,

    /// How album links are discovered
    #[arg(long, value_enum, default_value_t = ModeArg::Browser)]
    pub mode: ModeArg,

    /// Directory the Markdown files are written to
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// RON configuration file; built-in defaults otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Articles extracted concurrently per batch (overrides the config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Retries after a failed transport attempt (overrides the config)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Chrome/Chromium executable used in browser mode
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the records as JSON on stdout instead of writing files
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Scroll the album in a headless browser
    Browser,
    /// Scan one static fetch of the album page
    Static,
}

impl From<ModeArg> for HarvestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Browser => HarvestMode::Browser,
            ModeArg::Static => HarvestMode::Static,
        }
    }
}

impl Cli {
    pub fn request(&self) -> ExtractionRequest {
        let request = ExtractionRequest::new(self.url.trim()).with_mode(self.mode.into());
        match self.max_count {
            Some(count) => request.with_max_count(usize::try_from(count).unwrap_or(usize::MAX)),
            None => request,
        }
    }

    /// Applies the flags that take precedence over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ExtractorConfig) {
        if let Some(size) = self.batch_size {
            config.batch.batch_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        if let Some(retries) = self.max_retries {
            config.retry.max_retries = retries;
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
