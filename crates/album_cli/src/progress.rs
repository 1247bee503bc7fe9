use album_core::StopReason;
use album_engine::{EngineEvent, ProgressSink};

/// Prints one status line per event on stderr, keeping stdout free for `--json`.
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: EngineEvent) {
        if let Some(line) = describe(&event) {
            eprintln!("{line}");
        }
    }
}

fn describe(event: &EngineEvent) -> Option<String> {
    let line = match event {
        EngineEvent::HarvestRound {
            round,
            discovered,
            new_links,
        } => format!("round {round}: {discovered} links (+{new_links})"),
        EngineEvent::HarvestStopped { rounds, reason } => {
            let why = match reason {
                StopReason::TargetReached => "requested count reached",
                StopReason::Converged => "no new links",
                StopReason::RoundLimit => "round limit",
            };
            format!("scrolling stopped after {rounds} rounds: {why}")
        }
        EngineEvent::LinksDiscovered { count } => format!("{count} articles to extract"),
        EngineEvent::BatchStarted { index, total, size } => {
            format!("batch {index}/{total} ({size} articles)")
        }
        EngineEvent::ArticleExtracted { index, title, .. } => format!("  [{index}] {title}"),
        EngineEvent::ArticleSkipped { index, url, reason } => {
            format!("  [{index}] skipped {url}: {reason}")
        }
        EngineEvent::Finished { .. } => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use album_core::SkipReason;

    #[test]
    fn skipped_articles_show_the_reason() {
        let line = describe(&EngineEvent::ArticleSkipped {
            index: 4,
            url: "https://mp.weixin.qq.com/s?__biz=MzA&mid=4".into(),
            reason: SkipReason::ContentNotFound,
        });
        assert_eq!(
            line.as_deref(),
            Some("  [4] skipped https://mp.weixin.qq.com/s?__biz=MzA&mid=4: no article content found")
        );
    }

    #[test]
    fn finish_is_left_to_the_summary() {
        assert_eq!(
            describe(&EngineEvent::Finished {
                extracted: 1,
                skipped: 0
            }),
            None
        );
    }
}
