use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use album_core::{BatchSettings, FetchError, NetworkErrorKind, RetryPolicy, SkipReason};
use album_engine::{
    ArticleOutcome, BatchOrchestrator, ContentParser, DocumentFetcher, EngineEvent,
    MarkdownConverter, NoopProgressSink, ProgressSink,
};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

/// Serves scripted responses per URL and counts every call.
#[derive(Default)]
struct ScriptedFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    fn script(&self, url: &str, responses: Vec<Result<String, FetchError>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(FetchError::new(NetworkErrorKind::Other, "unscripted")))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(album_logging::initialize_for_tests);
}

fn article(title: &str) -> String {
    format!(
        r#"<html><body><h1 id="activity-name">{title}</h1>
        <div id="js_content"><p>Body of {title}</p></div></body></html>"#
    )
}

fn link(mid: u32) -> String {
    format!("https://mp.weixin.qq.com/s?__biz=MzA&mid={mid}")
}

fn timeout() -> Result<String, FetchError> {
    Err(FetchError::new(NetworkErrorKind::Timeout, "operation timed out"))
}

fn orchestrator(fetcher: Arc<ScriptedFetcher>, batch_size: usize) -> BatchOrchestrator {
    BatchOrchestrator::new(
        fetcher,
        Arc::new(ContentParser::platform()),
        MarkdownConverter::default(),
        BatchSettings {
            batch_size,
            unit_delay_min_ms: 0,
            unit_delay_max_ms: 0,
            window_pause_ms: 0,
        },
        RetryPolicy {
            max_retries: 3,
            base_delay_ms: 0,
        },
    )
}

#[tokio::test]
async fn three_timeouts_then_success_yields_a_record() {
    init_logging();
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.script(
        &link(1),
        vec![timeout(), timeout(), timeout(), Ok(article("Recovered"))],
    );

    let records = orchestrator(fetcher.clone(), 3)
        .extract_all(&[link(1)], &NoopProgressSink)
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Recovered");
    assert_eq!(records[0].url, link(1));
    assert_eq!(fetcher.calls(&link(1)), 4);
}

#[tokio::test]
async fn four_timeouts_exhaust_the_budget() {
    init_logging();
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.script(
        &link(1),
        vec![timeout(), timeout(), timeout(), timeout(), Ok(article("Too late"))],
    );

    let report = orchestrator(fetcher.clone(), 3)
        .extract_all_with_report(&[link(1)], &NoopProgressSink)
        .await;

    assert_eq!(report.records().count(), 0);
    let skipped: Vec<_> = report.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert!(matches!(
        skipped[0].1,
        SkipReason::RetriesExhausted { attempts: 4, .. }
    ));
    assert_eq!(fetcher.calls(&link(1)), 4);
}

#[tokio::test]
async fn http_404_is_skipped_without_retrying() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.script(
        &link(1),
        vec![Err(FetchError::new(NetworkErrorKind::HttpStatus(404), "404 Not Found"))],
    );
    fetcher.script(&link(2), vec![Ok(article("Second"))]);

    let records = orchestrator(fetcher.clone(), 3)
        .extract_all(&[link(1), link(2)], &NoopProgressSink)
        .await;

    assert_eq!(fetcher.calls(&link(1)), 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Second");
}

#[tokio::test]
async fn page_without_content_is_skipped() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.script(&link(1), vec![Ok("<html><body>verify you are human</body></html>".into())]);

    let report = orchestrator(fetcher.clone(), 3)
        .extract_all_with_report(&[link(1)], &NoopProgressSink)
        .await;

    assert_eq!(
        report.outcomes,
        vec![ArticleOutcome::Skipped {
            url: link(1),
            reason: SkipReason::ContentNotFound,
        }]
    );
    assert_eq!(fetcher.calls(&link(1)), 1);
}

#[tokio::test]
async fn output_follows_input_order_across_windows() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let links: Vec<String> = (1..=7).map(link).collect();
    for (i, url) in links.iter().enumerate() {
        // Earlier links need more attempts so they finish last within a window.
        let mut script = vec![timeout(); 3 - (i % 3)];
        script.push(Ok(article(&format!("Article {}", i + 1))));
        fetcher.script(url, script);
    }
    let sink = RecordingSink::default();

    let records = orchestrator(fetcher, 3).extract_all(&links, &sink).await;

    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Article 1", "Article 2", "Article 3", "Article 4", "Article 5", "Article 6",
            "Article 7"
        ]
    );

    let events = sink.events.lock().unwrap();
    let windows: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::BatchStarted { index, total, size } => Some((*index, *total, *size)),
            _ => None,
        })
        .collect();
    assert_eq!(windows, vec![(1, 3, 3), (2, 3, 3), (3, 3, 1)]);
    assert_eq!(
        events.last(),
        Some(&EngineEvent::Finished {
            extracted: 7,
            skipped: 0
        })
    );
}

/// One fetch as seen by [`TimedFetcher`].
#[derive(Debug, Clone)]
struct FetchSpan {
    url: String,
    started: Instant,
    finished: Instant,
}

/// Answers every fetch after `latency`, replaying a script per URL.
struct TimedFetcher {
    latency: Duration,
    inner: ScriptedFetcher,
    spans: Mutex<Vec<FetchSpan>>,
}

impl TimedFetcher {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            inner: ScriptedFetcher::default(),
            spans: Mutex::new(Vec::new()),
        }
    }

    fn spans_for(&self, urls: &[String]) -> Vec<FetchSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|span| urls.contains(&span.url))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for TimedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;
        let result = self.inner.fetch(url).await;
        self.spans.lock().unwrap().push(FetchSpan {
            url: url.to_string(),
            started,
            finished: Instant::now(),
        });
        result
    }
}

fn paced_orchestrator(
    fetcher: Arc<TimedFetcher>,
    settings: BatchSettings,
    retry: RetryPolicy,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        fetcher,
        Arc::new(ContentParser::platform()),
        MarkdownConverter::default(),
        settings,
        retry,
    )
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn windows_run_concurrently_and_wait_for_each_other() {
    let fetcher = Arc::new(TimedFetcher::new(ms(200)));
    let links: Vec<String> = (1..=6).map(link).collect();
    for (i, url) in links.iter().enumerate() {
        fetcher.inner.script(url, vec![Ok(article(&format!("Article {}", i + 1)))]);
    }
    let settings = BatchSettings {
        batch_size: 3,
        unit_delay_min_ms: 50,
        unit_delay_max_ms: 100,
        window_pause_ms: 300,
    };

    let begin = Instant::now();
    let records = paced_orchestrator(fetcher.clone(), settings, RetryPolicy::none())
        .extract_all(&links, &NoopProgressSink)
        .await;
    assert_eq!(records.len(), 6);

    let first = fetcher.spans_for(&links[..3]);
    let second = fetcher.spans_for(&links[3..]);
    assert_eq!((first.len(), second.len()), (3, 3));

    for span in &first {
        let delay = span.started - begin;
        assert!(delay >= ms(50) && delay <= ms(100 + 5), "unit delay {delay:?}");
    }
    // Every unit of a window is in flight before any of them finishes.
    let last_start = first.iter().map(|span| span.started).max().unwrap();
    let first_end = first.iter().map(|span| span.finished).min().unwrap();
    assert!(last_start < first_end);

    let window_end = first.iter().map(|span| span.finished).max().unwrap();
    for span in &second {
        let gap = span.started - window_end;
        assert!(gap >= ms(300 + 50) && gap <= ms(300 + 100 + 5), "window gap {gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_grows_with_each_attempt() {
    let fetcher = Arc::new(TimedFetcher::new(Duration::ZERO));
    fetcher.inner.script(
        &link(1),
        vec![timeout(), timeout(), timeout(), Ok(article("Patient"))],
    );
    let settings = BatchSettings {
        batch_size: 1,
        unit_delay_min_ms: 0,
        unit_delay_max_ms: 0,
        window_pause_ms: 0,
    };
    let retry = RetryPolicy {
        max_retries: 3,
        base_delay_ms: 100,
    };

    let records = paced_orchestrator(fetcher.clone(), settings, retry)
        .extract_all(&[link(1)], &NoopProgressSink)
        .await;
    assert_eq!(records.len(), 1);

    let starts: Vec<Instant> = fetcher
        .spans_for(&[link(1)])
        .iter()
        .map(|span| span.started)
        .collect();
    assert_eq!(starts.len(), 4);
    for (retry, pair) in starts.windows(2).enumerate() {
        let expected = ms(100 * (retry as u64 + 1));
        let gap = pair[1] - pair[0];
        assert!(gap >= expected && gap < expected + ms(5), "retry {} waited {gap:?}", retry + 1);
    }
}
