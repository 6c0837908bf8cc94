//! Headless Chromium implementation of [`LivePage`] via chromiumoxide.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

use super::browser::{LivePage, PageLauncher, ScrollMetrics};
use crate::config::AppConfig;
use crate::error::ExtractionError;
use crate::extract::collect::{LiveSnapshot, SNAPSHOT_SCRIPT};
use crate::fetch::BROWSER_USER_AGENT;

const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;

const PROFILE_PREFIX: &str = "image-extractor-profile-";

const SCROLL_METRICS_SCRIPT: &str = r#"({
  offset: window.pageYOffset,
  viewportHeight: window.innerHeight,
  documentHeight: document.body
    ? document.body.offsetHeight
    : document.documentElement.scrollHeight,
})"#;

/// Launches one Chromium process per request, each with its own throwaway profile.
pub struct ChromiumLauncher {
    chromium_path: Option<PathBuf>,
    no_sandbox: bool,
}

impl ChromiumLauncher {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chromium_path: config.chromium_path.clone(),
            no_sandbox: config.browser_no_sandbox,
        }
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig, ExtractionError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile)
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            })
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-accelerated-2d-canvas")
            .arg("--no-first-run")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");

        if let Some(path) = &self.chromium_path {
            builder = builder.chrome_executable(path);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }

        builder
            .build()
            .map_err(|e| ExtractionError::Browser(format!("invalid browser config: {e}")))
    }
}

fn profile_dir() -> Result<TempDir, ExtractionError> {
    tempfile::Builder::new()
        .prefix(PROFILE_PREFIX)
        .tempdir()
        .map_err(|e| ExtractionError::Browser(format!("failed to create browser profile: {e}")))
}

#[async_trait]
impl PageLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn LivePage>, ExtractionError> {
        let profile = profile_dir()?;
        let config = self.browser_config(profile.path())?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractionError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = HandlerTask(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        }));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!(error = %close_err, "failed to close browser after page error");
                }
                let _ = browser.wait().await;
                return Err(ExtractionError::Browser(format!("failed to open page: {e}")));
            }
        };

        if let Err(e) = page.set_user_agent(BROWSER_USER_AGENT).await {
            tracing::warn!(error = %e, "failed to set browser user agent");
        }
        if let Err(e) = page.execute(SetLifecycleEventsEnabledParams::new(true)).await {
            tracing::warn!(error = %e, "failed to enable lifecycle events");
        }

        tracing::debug!(profile = %profile.path().display(), "launched headless browser");
        Ok(Box::new(ChromiumPage {
            browser,
            page,
            profile,
            _handler: handler,
        }))
    }
}

/// Aborts the CDP event loop when the page is dropped without being closed.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    /// Removed on close, or on drop if the page is never closed.
    profile: TempDir,
    _handler: HandlerTask,
}

impl ChromiumPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T, ExtractionError> {
        self.page
            .evaluate_expression(script)
            .await
            .map_err(|e| ExtractionError::Browser(format!("script evaluation failed: {e}")))?
            .into_value()
            .map_err(|e| ExtractionError::Browser(format!("unexpected script result: {e}")))
    }
}

#[async_trait]
impl LivePage for ChromiumPage {
    async fn goto(&mut self, url: &Url, timeout: Duration) -> Result<Url, ExtractionError> {
        // Subscribed before navigating so an early idle event is not missed.
        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| ExtractionError::Browser(format!("lifecycle subscription failed: {e}")))?;

        match tokio::time::timeout(timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ExtractionError::Browser(format!("navigation failed: {e}"))),
            Err(_) => {
                return Err(ExtractionError::Browser(format!(
                    "navigation timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }

        let main_frame = self.page.mainframe().await.ok().flatten();
        let idle = async {
            while let Some(event) = lifecycle.next().await {
                let in_main_frame = main_frame.as_ref().map_or(true, |id| *id == event.frame_id);
                if in_main_frame && event.name == "networkIdle" {
                    return;
                }
            }
        };
        if tokio::time::timeout(timeout, idle).await.is_err() {
            tracing::debug!(url = %url, "network did not go idle before the navigation bound");
        }

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());
        Ok(final_url)
    }

    async fn scroll_metrics(&self) -> Result<ScrollMetrics, ExtractionError> {
        self.eval(SCROLL_METRICS_SCRIPT).await
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), ExtractionError> {
        self.page
            .evaluate_expression(format!("window.scrollBy(0, {dy})"))
            .await
            .map(|_| ())
            .map_err(|e| ExtractionError::Browser(format!("scroll failed: {e}")))
    }

    async fn snapshot(&self) -> Result<LiveSnapshot, ExtractionError> {
        self.eval(SNAPSHOT_SCRIPT).await
    }

    async fn close(self: Box<Self>) -> Result<(), ExtractionError> {
        let ChromiumPage {
            mut browser,
            page,
            profile,
            _handler,
        } = *self;

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "page close failed");
        }
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ExtractionError::Browser(format!("failed to close browser: {e}")));
        let _ = browser.wait().await;

        let path = profile.path().to_path_buf();
        if let Err(e) = profile.close() {
            tracing::warn!(profile = %path.display(), error = %e, "failed to remove browser profile");
        }
        tracing::debug!("browser closed");
        closed
    }
}
