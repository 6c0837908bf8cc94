//! Scroll-driven sampling of a rendered page.
//!
//! The acquirer walks `Launching → PageLoaded → ScrollStep* → FinalSample →
//! Closed`. The page is closed as soon as the final sample is taken, and
//! [`PageAcquirer::release`] closes it on any earlier exit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{PageAcquirer, PageAcquisitionPass, PassContent, FINAL_PASS_INDEX};
use crate::error::ExtractionError;
use crate::extract::collect::LiveSnapshot;

/// Extra scroll after each viewport step; many loaders only fire once an
/// element is strictly inside the viewport.
const LAZY_LOAD_NUDGE_PX: f64 = 100.0;

/// Distance from the end of the document treated as "at the bottom".
const BOTTOM_TOLERANCE_PX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub offset: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    pub fn at_bottom(&self) -> bool {
        self.offset + self.viewport_height >= self.document_height - BOTTOM_TOLERANCE_PX
    }
}

/// A single open browser page.
#[async_trait]
pub trait LivePage: Send + Sync {
    /// Navigate and wait for the load to settle; returns the final URL.
    async fn goto(&mut self, url: &Url, timeout: Duration) -> Result<Url, ExtractionError>;
    async fn scroll_metrics(&self) -> Result<ScrollMetrics, ExtractionError>;
    async fn scroll_by(&self, dy: f64) -> Result<(), ExtractionError>;
    async fn snapshot(&self) -> Result<LiveSnapshot, ExtractionError>;
    /// Close the page and the browser that owns it.
    async fn close(self: Box<Self>) -> Result<(), ExtractionError>;
}

/// Starts an isolated, single-use browser with one page.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn LivePage>, ExtractionError>;
}

/// Timing and bounds of one scroll session.
#[derive(Debug, Clone)]
pub struct ScrollPlan {
    pub max_scrolls: u32,
    pub wait_after_scroll: Duration,
    pub scroll_delay: Duration,
    pub initial_settle: Duration,
    pub final_settle: Duration,
    pub navigation_timeout: Duration,
}

impl ScrollPlan {
    pub fn new(
        max_scrolls: u32,
        wait_after_scroll: Duration,
        scroll_delay: Duration,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            max_scrolls,
            wait_after_scroll,
            scroll_delay,
            initial_settle: Duration::from_millis(2000),
            final_settle: Duration::from_millis(2000),
            navigation_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    Launching,
    PageLoaded,
    ScrollStep(u32),
    FinalSample,
    Closed,
}

pub struct BrowserAcquirer {
    launcher: Arc<dyn PageLauncher>,
    target: Url,
    plan: ScrollPlan,
    page: Option<Box<dyn LivePage>>,
    document_url: Url,
    state: BrowserState,
}

impl BrowserAcquirer {
    pub fn new(launcher: Arc<dyn PageLauncher>, target: Url, plan: ScrollPlan) -> Self {
        Self {
            launcher,
            document_url: target.clone(),
            target,
            plan,
            page: None,
            state: BrowserState::Launching,
        }
    }

    pub fn state(&self) -> BrowserState {
        self.state
    }

    fn page(&self) -> Result<&dyn LivePage, ExtractionError> {
        self.page
            .as_deref()
            .ok_or_else(|| ExtractionError::Browser("page is not open".to_string()))
    }

    async fn open(&mut self) -> Result<(), ExtractionError> {
        let page = self.launcher.launch().await?;
        // Stored before navigating so a failed navigation is still closed.
        let page = self.page.insert(page);
        self.document_url = page.goto(&self.target, self.plan.navigation_timeout).await?;
        tracing::info!(url = %self.document_url, "page loaded");
        Ok(())
    }

    async fn sample(&self, index: i64) -> PageAcquisitionPass {
        let content = match self.page() {
            Ok(page) => match page.snapshot().await {
                Ok(snapshot) => PassContent::Live(snapshot),
                Err(e) => PassContent::Failed(e),
            },
            Err(e) => PassContent::Failed(e),
        };
        PageAcquisitionPass {
            index,
            document_url: self.document_url.clone(),
            content,
        }
    }

    /// Scroll one viewport, let lazy loaders run, and sample. Returns the
    /// pass and whether the document bottom has been reached.
    async fn scroll_step(&self, step: u32) -> (PageAcquisitionPass, bool) {
        match self.scroll_once().await {
            Ok(after) => {
                let index = (after.offset.round() as i64).max(i64::from(step) + 1);
                (self.sample(index).await, after.at_bottom())
            }
            Err(e) => {
                let pass = PageAcquisitionPass {
                    index: i64::from(step) + 1,
                    document_url: self.document_url.clone(),
                    content: PassContent::Failed(e),
                };
                (pass, false)
            }
        }
    }

    async fn scroll_once(&self) -> Result<ScrollMetrics, ExtractionError> {
        let page = self.page()?;
        let before = page.scroll_metrics().await?;
        page.scroll_by(before.viewport_height).await?;
        tokio::time::sleep(self.plan.wait_after_scroll).await;
        page.scroll_by(LAZY_LOAD_NUDGE_PX).await?;
        tokio::time::sleep(self.plan.scroll_delay).await;
        page.scroll_metrics().await
    }

    async fn close_page(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!(error = %e, "failed to close browser");
            }
        }
        self.state = BrowserState::Closed;
    }
}

#[async_trait]
impl PageAcquirer for BrowserAcquirer {
    async fn next_pass(&mut self) -> Result<Option<PageAcquisitionPass>, ExtractionError> {
        if self.state == BrowserState::Launching {
            self.open().await?;
            self.state = BrowserState::PageLoaded;
        }

        match self.state {
            BrowserState::Launching | BrowserState::Closed => Ok(None),
            BrowserState::PageLoaded => {
                tokio::time::sleep(self.plan.initial_settle).await;
                let pass = self.sample(0).await;
                self.state = if self.plan.max_scrolls == 0 {
                    BrowserState::FinalSample
                } else {
                    BrowserState::ScrollStep(0)
                };
                Ok(Some(pass))
            }
            BrowserState::ScrollStep(step) => {
                let (pass, at_bottom) = self.scroll_step(step).await;
                self.state = if at_bottom || step + 1 >= self.plan.max_scrolls {
                    if at_bottom {
                        tracing::debug!(step, "reached bottom of page");
                    }
                    BrowserState::FinalSample
                } else {
                    BrowserState::ScrollStep(step + 1)
                };
                Ok(Some(pass))
            }
            BrowserState::FinalSample => {
                tokio::time::sleep(self.plan.final_settle).await;
                let pass = self.sample(FINAL_PASS_INDEX).await;
                self.close_page().await;
                Ok(Some(pass))
            }
        }
    }

    async fn release(&mut self) {
        self.close_page().await;
    }
}
