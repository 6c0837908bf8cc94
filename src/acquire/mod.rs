//! Page acquisition: how raw page content is sampled for the collector.
//!
//! Every variant yields an ordered sequence of [`PageAcquisitionPass`]es
//! through the same [`PageAcquirer`] trait. A failed sample is reported
//! in-band as [`PassContent::Failed`] so the orchestrator decides whether
//! it is fatal.

pub mod browser;
pub mod chromium;
pub mod http;

use async_trait::async_trait;
use url::Url;

use crate::error::ExtractionError;
use crate::extract::collect::LiveSnapshot;

pub use browser::{BrowserAcquirer, BrowserState, LivePage, PageLauncher, ScrollMetrics, ScrollPlan};
pub use chromium::ChromiumLauncher;
pub use http::{RepeatedFetchAcquirer, SingleFetchAcquirer};

/// Pass index of the sample taken after scrolling has finished.
pub const FINAL_PASS_INDEX: i64 = -1;

#[derive(Debug)]
pub enum PassContent {
    Html(String),
    Live(LiveSnapshot),
    Failed(ExtractionError),
}

/// One sampling of the page.
#[derive(Debug)]
pub struct PageAcquisitionPass {
    /// Ordinal for fetch passes; scroll offset in pixels for browser passes.
    pub index: i64,
    /// URL the content was served from, used to resolve relative references.
    pub document_url: Url,
    pub content: PassContent,
}

#[async_trait]
pub trait PageAcquirer: Send {
    /// Next sample, or `None` when the acquirer is exhausted. An `Err` aborts
    /// the whole extraction.
    async fn next_pass(&mut self) -> Result<Option<PageAcquisitionPass>, ExtractionError>;

    /// Release any held resources. Called exactly once on every exit path.
    async fn release(&mut self) {}
}
