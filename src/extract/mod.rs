//! Image-reference extraction: normalize, classify and deduplicate the
//! candidates collected from every acquisition pass.

pub mod accumulator;
pub mod classify;
pub mod collect;
pub mod normalize;

use std::collections::BTreeMap;

use url::Url;

use crate::acquire::{PageAcquirer, PageAcquisitionPass, PassContent};
use crate::error::ExtractionError;
use crate::models::ImageRecord;

use accumulator::ImageAccumulator;
use classify::{classify, PathPatternSet};
use collect::{collect_candidates, ImageCandidate, StaticPage};
use normalize::normalize_candidate;

// ── Public result type ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub records: Vec<ImageRecord>,
    pub total_passes: usize,
    pub stats_by_provenance: BTreeMap<String, usize>,
    pub stats_by_pass: BTreeMap<i64, usize>,
}

impl ExtractionResult {
    fn from_accumulator(acc: ImageAccumulator, total_passes: usize) -> Self {
        let stats_by_provenance = acc.stats_by_provenance();
        let stats_by_pass = acc.stats_by_pass();
        Self {
            records: acc.into_records(),
            total_passes,
            stats_by_provenance,
            stats_by_pass,
        }
    }
}

// ── URL validation ───────────────────────────────────────────────────────────

pub fn parse_target_url(raw: Option<&str>) -> Result<Url, ExtractionError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ExtractionError::InvalidUrl("URL is required".to_string()));
    };
    let parsed = Url::parse(raw)
        .map_err(|_| ExtractionError::InvalidUrl("Invalid URL format".to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ExtractionError::InvalidUrl(
            "Only http and https URLs are supported".to_string(),
        ));
    }
    Ok(parsed)
}

// ── Orchestration ────────────────────────────────────────────────────────────

/// Drive `acquirer` to exhaustion and merge every pass into one result.
///
/// A failed pass contributes nothing and the remaining passes still run;
/// only an error from the acquirer itself fails the extraction. The
/// acquirer is released on every path.
pub async fn run_extraction(
    target: &Url,
    acquirer: &mut dyn PageAcquirer,
    patterns: PathPatternSet,
) -> Result<ExtractionResult, ExtractionError> {
    let outcome = drive_passes(target, acquirer, patterns).await;
    acquirer.release().await;
    outcome
}

async fn drive_passes(
    target: &Url,
    acquirer: &mut dyn PageAcquirer,
    patterns: PathPatternSet,
) -> Result<ExtractionResult, ExtractionError> {
    let mut acc = ImageAccumulator::new();
    let mut total_passes = 0usize;

    while let Some(pass) = acquirer.next_pass().await? {
        total_passes += 1;
        if let Err((index, e)) = ingest_pass(&mut acc, target, pass, patterns) {
            tracing::warn!(pass = index, error = %e, "acquisition pass failed");
        }
    }

    tracing::info!(url = %target, passes = total_passes, images = acc.len(), "extraction finished");
    Ok(ExtractionResult::from_accumulator(acc, total_passes))
}

fn ingest_pass(
    acc: &mut ImageAccumulator,
    target: &Url,
    pass: PageAcquisitionPass,
    patterns: PathPatternSet,
) -> Result<(), (i64, ExtractionError)> {
    let candidates = match pass.content {
        PassContent::Html(html) => collect_candidates(&StaticPage::parse_document(&html)),
        PassContent::Live(snapshot) => collect_candidates(&snapshot),
        PassContent::Failed(e) => return Err((pass.index, e)),
    };

    let seen = candidates.len();
    let added = merge_candidates(acc, candidates, target, &pass.document_url, pass.index, patterns);
    tracing::info!(
        pass = pass.index,
        candidates = seen,
        added,
        total = acc.len(),
        "pass collected"
    );
    Ok(())
}

/// Normalize, classify and insert candidates; returns how many records were new.
pub fn merge_candidates(
    acc: &mut ImageAccumulator,
    candidates: Vec<ImageCandidate>,
    page_base: &Url,
    document_url: &Url,
    pass_index: i64,
    patterns: PathPatternSet,
) -> usize {
    let mut added = 0;
    for candidate in candidates {
        let Some(url) = normalize_candidate(&candidate.raw_src, page_base, document_url) else {
            continue;
        };
        if acc.contains(url.as_str()) {
            continue;
        }
        let Some(file_type) = classify(&url, patterns) else {
            continue;
        };
        let inserted = acc.insert(ImageRecord {
            url: url.into(),
            alt_text: candidate.alt_text,
            file_type,
            provenance: candidate.provenance,
            pass_index,
        });
        if inserted {
            added += 1;
        }
    }
    added
}

/// Single-pass extraction over already-fetched HTML.
pub fn extract_from_html(html: &str, base_url: &Url, patterns: PathPatternSet) -> ExtractionResult {
    let mut acc = ImageAccumulator::new();
    let candidates = collect_candidates(&StaticPage::parse_document(html));
    merge_candidates(&mut acc, candidates, base_url, base_url, 0, patterns);
    ExtractionResult::from_accumulator(acc, 1)
}
