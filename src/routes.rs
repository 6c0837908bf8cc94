use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use url::Url;

use crate::acquire::{
    BrowserAcquirer, ChromiumLauncher, PageAcquirer, PageLauncher, RepeatedFetchAcquirer,
    ScrollPlan, SingleFetchAcquirer,
};
use crate::config::AppConfig;
use crate::download::download_images;
use crate::error::ExtractionError;
use crate::extract::classify::PathPatternSet;
use crate::extract::{parse_target_url, run_extraction, ExtractionResult};
use crate::fetch::build_client;
use crate::models::{
    BrowserExtractRequest, DownloadRequest, DownloadResponse, EnhancedExtractRequest,
    ExtractRequest, ExtractResponse, ScrollExtractRequest,
};

/// How a response's images were acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    StaticFetch,
    RepeatedFetch,
    ScrollSimulation,
    BrowserScroll,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::StaticFetch => "static-fetch",
            ExtractionMethod::RepeatedFetch => "repeated-fetch",
            ExtractionMethod::ScrollSimulation => "scroll-simulation",
            ExtractionMethod::BrowserScroll => "browser-scroll",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: reqwest::Client,
    pub launcher: Arc<dyn PageLauncher>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ExtractionError> {
        let client = build_client(&config)?;
        let launcher = Arc::new(ChromiumLauncher::from_config(&config));
        Ok(Self {
            config: Arc::new(config),
            client,
            launcher,
        })
    }

    /// Replace the browser backend, e.g. with a scripted page in tests.
    pub fn with_launcher(mut self, launcher: Arc<dyn PageLauncher>) -> Self {
        self.launcher = launcher;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extract-images", post(extract_basic))
        .route("/api/extract-images-enhanced", post(extract_enhanced))
        .route("/api/extract-images-scroll", post(extract_scroll))
        .route("/api/extract-images-browser", post(extract_browser))
        .route("/api/download-images", post(download))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ExtractionError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| ExtractionError::InvalidRequest(rejection.body_text()))
}

/// Run one extraction and build the shared part of the response. The
/// per-pass stats are returned separately so each variant can name them.
async fn extract_with(
    target: &Url,
    acquirer: &mut dyn PageAcquirer,
    patterns: PathPatternSet,
    method: ExtractionMethod,
) -> Result<(ExtractResponse, BTreeMap<i64, usize>), ExtractionError> {
    tracing::info!(url = %target, method = method.as_str(), "extracting images");
    let ExtractionResult {
        records,
        stats_by_provenance,
        stats_by_pass,
        ..
    } = run_extraction(target, acquirer, patterns).await?;

    let response = ExtractResponse {
        total: records.len(),
        images: records,
        url: target.to_string(),
        source_stats: stats_by_provenance,
        method: method.as_str().to_string(),
        pass_stats: None,
        attempt_stats: None,
        scroll_stats: None,
        wait_time: None,
        scroll_attempts: None,
        wait_between_scrolls: None,
        max_scrolls: None,
        scroll_delay: None,
        wait_after_scroll: None,
    };
    Ok((response, stats_by_pass))
}

async fn extract_basic(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ExtractionError> {
    let req = body(payload)?;
    let target = parse_target_url(req.url.as_deref())?;

    let mut acquirer = SingleFetchAcquirer::new(state.client.clone(), target.clone());
    let (mut response, pass_stats) = extract_with(
        &target,
        &mut acquirer,
        state.config.basic_patterns,
        ExtractionMethod::StaticFetch,
    )
    .await?;
    response.pass_stats = Some(pass_stats);
    Ok(Json(response))
}

async fn extract_enhanced(
    State(state): State<AppState>,
    payload: Result<Json<EnhancedExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ExtractionError> {
    let req = body(payload)?;
    let target = parse_target_url(req.url.as_deref())?;
    let wait = state.config.clamp_delay(req.wait_time);

    let mut acquirer = RepeatedFetchAcquirer::enhanced(state.client.clone(), target.clone(), wait);
    let (mut response, pass_stats) = extract_with(
        &target,
        &mut acquirer,
        PathPatternSet::Extended,
        ExtractionMethod::RepeatedFetch,
    )
    .await?;
    response.pass_stats = Some(pass_stats);
    response.wait_time = Some(wait.as_millis() as u64);
    Ok(Json(response))
}

async fn extract_scroll(
    State(state): State<AppState>,
    payload: Result<Json<ScrollExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ExtractionError> {
    let req = body(payload)?;
    let target = parse_target_url(req.url.as_deref())?;
    let attempts = req.scroll_attempts.clamp(1, state.config.max_passes.max(1));
    let delay = state.config.clamp_delay(req.wait_between_scrolls);

    let mut acquirer =
        RepeatedFetchAcquirer::scroll_simulation(state.client.clone(), target.clone(), attempts, delay);
    let (mut response, pass_stats) = extract_with(
        &target,
        &mut acquirer,
        PathPatternSet::Extended,
        ExtractionMethod::ScrollSimulation,
    )
    .await?;
    response.attempt_stats = Some(pass_stats);
    response.scroll_attempts = Some(attempts);
    response.wait_between_scrolls = Some(delay.as_millis() as u64);
    Ok(Json(response))
}

async fn extract_browser(
    State(state): State<AppState>,
    payload: Result<Json<BrowserExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ExtractionError> {
    let req = body(payload)?;
    let target = parse_target_url(req.url.as_deref())?;
    let max_scrolls = req.max_scrolls.min(state.config.max_scrolls);
    let scroll_delay = state.config.clamp_delay(req.scroll_delay);
    let wait_after_scroll = state.config.clamp_delay(req.wait_after_scroll);

    let mut plan = ScrollPlan::new(
        max_scrolls,
        wait_after_scroll,
        scroll_delay,
        state.config.navigation_timeout,
    );
    let max_delay = state.config.clamp_delay(u64::MAX);
    plan.initial_settle = plan.initial_settle.min(max_delay);
    plan.final_settle = plan.final_settle.min(max_delay);
    let mut acquirer = BrowserAcquirer::new(state.launcher.clone(), target.clone(), plan);
    let (mut response, pass_stats) = extract_with(
        &target,
        &mut acquirer,
        PathPatternSet::Extended,
        ExtractionMethod::BrowserScroll,
    )
    .await?;
    response.scroll_stats = Some(pass_stats);
    response.max_scrolls = Some(max_scrolls);
    response.scroll_delay = Some(scroll_delay.as_millis() as u64);
    response.wait_after_scroll = Some(wait_after_scroll.as_millis() as u64);
    Ok(Json(response))
}

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ExtractionError> {
    let req = body(payload)?;
    if req.image_urls.is_empty() {
        return Err(ExtractionError::InvalidRequest(
            "Image URLs are required".to_string(),
        ));
    }
    if req.image_urls.len() > state.config.max_downloads {
        return Err(ExtractionError::InvalidRequest(format!(
            "At most {} image URLs can be downloaded per request",
            state.config.max_downloads
        )));
    }

    tracing::info!(count = req.image_urls.len(), "downloading images");
    Ok(Json(download_images(&state.client, &req.image_urls).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_labels() {
        assert_eq!(ExtractionMethod::StaticFetch.as_str(), "static-fetch");
        assert_eq!(ExtractionMethod::RepeatedFetch.as_str(), "repeated-fetch");
        assert_eq!(ExtractionMethod::ScrollSimulation.as_str(), "scroll-simulation");
        assert_eq!(ExtractionMethod::BrowserScroll.as_str(), "browser-scroll");
    }
}
