use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{PageAcquirer, PageAcquisitionPass, PassContent};
use crate::error::ExtractionError;
use crate::fetch::{fetch_page, HeaderProfile};

/// One plain fetch of the target. A failed fetch is returned as an error
/// and fails the extraction.
pub struct SingleFetchAcquirer {
    client: reqwest::Client,
    target: Url,
    done: bool,
}

impl SingleFetchAcquirer {
    pub fn new(client: reqwest::Client, target: Url) -> Self {
        Self {
            client,
            target,
            done: false,
        }
    }
}

#[async_trait]
impl PageAcquirer for SingleFetchAcquirer {
    async fn next_pass(&mut self) -> Result<Option<PageAcquisitionPass>, ExtractionError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let page = fetch_page(&self.client, &self.target, HeaderProfile::Basic).await?;
        Ok(Some(PageAcquisitionPass {
            index: 0,
            document_url: page.final_url,
            content: PassContent::Html(page.html),
        }))
    }
}

/// Re-fetches the same URL several times with a delay before every fetch
/// but the first, catching content an origin only inserts on later loads.
/// Nothing is rendered or scrolled; each pass is a fresh static response.
/// A failed fetch becomes an empty pass and never aborts the sequence.
pub struct RepeatedFetchAcquirer {
    client: reqwest::Client,
    target: Url,
    passes: u32,
    delay: Duration,
    vary_headers: bool,
    next: u32,
}

impl RepeatedFetchAcquirer {
    /// An immediate fetch, then one more after `wait` when `wait` is non-zero.
    pub fn enhanced(client: reqwest::Client, target: Url, wait: Duration) -> Self {
        let passes = if wait.is_zero() { 1 } else { 2 };
        Self {
            client,
            target,
            passes,
            delay: wait,
            vary_headers: false,
            next: 0,
        }
    }

    /// `attempts` fetches spaced by `delay`, with headers that shift per attempt.
    pub fn scroll_simulation(
        client: reqwest::Client,
        target: Url,
        attempts: u32,
        delay: Duration,
    ) -> Self {
        Self {
            client,
            target,
            passes: attempts,
            delay,
            vary_headers: true,
            next: 0,
        }
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }
}

#[async_trait]
impl PageAcquirer for RepeatedFetchAcquirer {
    async fn next_pass(&mut self) -> Result<Option<PageAcquisitionPass>, ExtractionError> {
        if self.next >= self.passes {
            return Ok(None);
        }
        let attempt = self.next;
        self.next += 1;

        if attempt > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let profile = if self.vary_headers {
            HeaderProfile::Sampling { attempt }
        } else {
            HeaderProfile::NoCache
        };
        Ok(Some(
            fetch_pass(&self.client, &self.target, i64::from(attempt), profile).await,
        ))
    }
}

async fn fetch_pass(
    client: &reqwest::Client,
    target: &Url,
    index: i64,
    profile: HeaderProfile,
) -> PageAcquisitionPass {
    match fetch_page(client, target, profile).await {
        Ok(page) => PageAcquisitionPass {
            index,
            document_url: page.final_url,
            content: PassContent::Html(page.html),
        },
        Err(e) => PageAcquisitionPass {
            index,
            document_url: target.clone(),
            content: PassContent::Failed(e),
        },
    }
}
