#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use page_image_extractor::acquire::{LivePage, PageLauncher, ScrollMetrics, ScrollPlan};
use page_image_extractor::error::ExtractionError;
use page_image_extractor::extract::collect::{LiveSnapshot, SnapshotElement};
use url::Url;

/// Counters shared between a [`ScriptedLauncher`] and the pages it opens.
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub snapshots: AtomicUsize,
    pub scrolls: AtomicUsize,
}

impl BrowserLog {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

/// An image that only exists in the DOM once the page is scrolled past `offset`.
#[derive(Debug, Clone)]
pub struct Reveal {
    pub offset: f64,
    pub src: &'static str,
    pub alt: &'static str,
}

/// In-memory browser whose document grows as it is scrolled.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    pub log: Arc<BrowserLog>,
    pub viewport_height: f64,
    pub document_height: f64,
    pub landing_url: Option<Url>,
    pub initial: Vec<SnapshotElement>,
    pub reveals: Vec<Reveal>,
    pub fail_launch: bool,
    pub fail_goto: bool,
    /// Zero-based snapshot calls that fail.
    pub failing_snapshots: Vec<usize>,
    /// Zero-based `scroll_by` calls that fail.
    pub failing_scrolls: Vec<usize>,
}

impl ScriptedLauncher {
    pub fn new(initial: Vec<SnapshotElement>) -> Self {
        Self {
            log: Arc::new(BrowserLog::default()),
            viewport_height: 1000.0,
            document_height: 10_000.0,
            landing_url: None,
            initial,
            reveals: Vec::new(),
            fail_launch: false,
            fail_goto: false,
            failing_snapshots: Vec::new(),
            failing_scrolls: Vec::new(),
        }
    }
}

#[async_trait]
impl PageLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn LivePage>, ExtractionError> {
        if self.fail_launch {
            return Err(ExtractionError::Browser("no browser available".into()));
        }
        self.log.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            script: self.clone(),
            offset: Mutex::new(0.0),
        }))
    }
}

struct ScriptedPage {
    script: ScriptedLauncher,
    offset: Mutex<f64>,
}

impl ScriptedPage {
    fn offset(&self) -> f64 {
        *self.offset.lock().unwrap()
    }
}

#[async_trait]
impl LivePage for ScriptedPage {
    async fn goto(&mut self, url: &Url, _timeout: Duration) -> Result<Url, ExtractionError> {
        if self.script.fail_goto {
            return Err(ExtractionError::Browser("navigation timed out after 1ms".into()));
        }
        Ok(self.script.landing_url.clone().unwrap_or_else(|| url.clone()))
    }

    async fn scroll_metrics(&self) -> Result<ScrollMetrics, ExtractionError> {
        Ok(ScrollMetrics {
            offset: self.offset(),
            viewport_height: self.script.viewport_height,
            document_height: self.script.document_height,
        })
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), ExtractionError> {
        let call = self.script.log.scrolls.fetch_add(1, Ordering::SeqCst);
        if self.script.failing_scrolls.contains(&call) {
            return Err(ExtractionError::Browser("scroll failed: target closed".into()));
        }
        let max = (self.script.document_height - self.script.viewport_height).max(0.0);
        let mut offset = self.offset.lock().unwrap();
        *offset = (*offset + dy).clamp(0.0, max);
        Ok(())
    }

    async fn snapshot(&self) -> Result<LiveSnapshot, ExtractionError> {
        let call = self.script.log.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.script.failing_snapshots.contains(&call) {
            return Err(ExtractionError::Browser("execution context was destroyed".into()));
        }
        let offset = self.offset();
        let mut elements = self.script.initial.clone();
        elements.extend(
            self.script
                .reveals
                .iter()
                .filter(|r| offset >= r.offset)
                .map(|r| SnapshotElement::new("img", &[("src", r.src), ("alt", r.alt)])),
        );
        Ok(LiveSnapshot { elements })
    }

    async fn close(self: Box<Self>) -> Result<(), ExtractionError> {
        self.script.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A scroll plan with every wait removed.
pub fn instant_plan(max_scrolls: u32) -> ScrollPlan {
    ScrollPlan {
        max_scrolls,
        wait_after_scroll: Duration::ZERO,
        scroll_delay: Duration::ZERO,
        initial_settle: Duration::ZERO,
        final_settle: Duration::ZERO,
        navigation_timeout: Duration::from_secs(1),
    }
}
