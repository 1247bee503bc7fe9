mod cli;
mod progress;

use std::sync::Arc;

use album_core::{ExtractorConfig, HarvestMode};
use album_engine::{
    AlbumExtractor, BrowserLauncher, ChromiumLauncher, MarkdownExporter, UnavailableLauncher,
    UserAgentRotator,
};
use album_logging::{album_info, album_warn};
use anyhow::{anyhow, Context, Result};
use clap::Parser;

use crate::cli::Cli;
use crate::progress::TerminalProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    album_logging::initialize(cli.log_destination(), cli.log_level());

    let mut config = match &cli.config {
        Some(path) => ExtractorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ExtractorConfig::default(),
    };
    cli.apply_overrides(&mut config);

    let request = cli.request();
    let launcher = browser_launcher(&cli, &config, request.mode);
    let extractor = AlbumExtractor::new(config, launcher)
        .map_err(|err| anyhow!("{}: {err}", err.kind()))?;

    let report = extractor
        .extract_with_report(&request, &TerminalProgress)
        .await
        .map_err(|err| anyhow!("{}: {err}", err.kind()))?;
    let skipped = report.skipped().count();
    let records = report.into_records();
    if skipped > 0 {
        album_warn!("{} articles were skipped", skipped);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let summary = MarkdownExporter::new(&cli.output)
        .write_all(&records, chrono::Utc::now())
        .with_context(|| format!("writing Markdown to {}", cli.output.display()))?;
    album_info!(
        "wrote {} articles ({} skipped) to {}",
        summary.files.len(),
        skipped,
        summary.directory.display()
    );
    Ok(())
}

fn browser_launcher(cli: &Cli, config: &ExtractorConfig, mode: HarvestMode) -> Arc<dyn BrowserLauncher> {
    match mode {
        HarvestMode::Static => Arc::new(UnavailableLauncher::new("static mode selected")),
        HarvestMode::Browser => {
            let agents = UserAgentRotator::default();
            let mut launcher = ChromiumLauncher::new(config.harvest.navigation_timeout())
                .with_user_agent(agents.next_agent());
            if let Some(path) = &cli.chrome {
                launcher = launcher.with_executable(path);
            }
            Arc::new(launcher)
        }
    }
}
