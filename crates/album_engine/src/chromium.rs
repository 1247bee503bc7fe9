use std::path::PathBuf;
use std::time::Duration;

use album_logging::{album_debug, album_info, album_warn};
use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, WaitPolicy};

const SCROLL_SCRIPT: &str =
    "(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()";

/// Launches a local headless Chrome/Chromium through chromiumoxide.
///
/// When no executable is given, chromiumoxide's own lookup decides; a failed
/// lookup or launch surfaces as [`BrowserError::Unavailable`].
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    user_agent: Option<String>,
    navigation_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(navigation_timeout: Duration) -> Self {
        Self {
            executable: None,
            user_agent: None,
            navigation_timeout,
        }
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if let Some(user_agent) = &self.user_agent {
            args.push(format!("--user-agent={user_agent}"));
        }

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .window_size(1280, 2000)
            .request_timeout(self.navigation_timeout)
            .args(args);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(BrowserError::Unavailable)
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Unavailable(err.to_string()))?;
        album_info!("headless browser launched");

        // Drive the CDP event loop in the background.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page: None,
            events,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    events: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Script("no page has been opened".into()))
    }
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<(), BrowserError> {
        let timeout = self.navigation_timeout;
        let navigation_error = |message: String| BrowserError::Navigation {
            url: url.to_string(),
            message,
        };

        if self.page.is_none() {
            let page = tokio::time::timeout(timeout, self.browser.new_page("about:blank"))
                .await
                .map_err(|_| navigation_error("timed out opening a page".into()))?
                .map_err(|err| navigation_error(err.to_string()))?;
            self.page = Some(page);
        }
        // The session keeps its page whatever happens to this navigation.
        let page = self.page()?.clone();

        let navigation = async {
            match wait {
                WaitPolicy::Load => page.goto(url).await.map(|_| ()),
                WaitPolicy::NetworkIdle => {
                    let lifecycle = page.event_listener::<EventLifecycleEvent>().await?;
                    page.goto(url).await?;
                    wait_for_network_idle(&page, lifecycle).await
                }
            }
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| navigation_error("timed out".into()))?
            .map_err(|err| navigation_error(err.to_string()))?;
        album_debug!("navigated to {}", url);
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page()?
            .evaluate(script.to_string())
            .await
            .map_err(|err| BrowserError::Script(err.to_string()))?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|err| BrowserError::Script(err.to_string()))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.evaluate(SCROLL_SCRIPT).await.map(|_| ())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                album_warn!("failed to close page: {}", err);
            }
        }
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Script(err.to_string()));
        let _ = self.browser.wait().await;
        self.events.abort();
        closed
    }
}

/// Blocks until the main frame's current document reports `networkIdle`.
///
/// Falls back to the load event when the lifecycle stream ends first.
async fn wait_for_network_idle(
    page: &Page,
    mut lifecycle: EventStream<EventLifecycleEvent>,
) -> Result<(), CdpError> {
    let main_frame = page.mainframe().await?;
    let mut watch = IdleWatch::new(main_frame.map(|frame| frame.inner().clone()));
    while let Some(event) = lifecycle.next().await {
        if watch.observe(event.frame_id.inner(), event.loader_id.inner(), &event.name) {
            return Ok(());
        }
    }
    album_debug!("lifecycle stream ended before networkIdle");
    page.wait_for_navigation().await.map(|_| ())
}

/// Matches lifecycle events to the document a navigation committed.
///
/// `init` marks the new document's loader; only a `networkIdle` from that
/// loader counts, so a late event from the previous page is ignored.
#[derive(Debug, Default)]
struct IdleWatch {
    main_frame: Option<String>,
    loader: Option<String>,
}

impl IdleWatch {
    fn new(main_frame: Option<String>) -> Self {
        Self {
            main_frame,
            loader: None,
        }
    }

    fn observe(&mut self, frame: &str, loader: &str, name: &str) -> bool {
        if self.main_frame.as_deref().is_some_and(|main| main != frame) {
            return false;
        }
        match name {
            "init" => {
                self.loader = Some(loader.to_string());
                false
            }
            "networkIdle" => self.loader.as_deref() == Some(loader),
            _ => false,
        }
    }
}
