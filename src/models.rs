use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedExtractRequest {
    pub url: Option<String>,
    #[serde(default = "default_wait_time")]
    pub wait_time: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollExtractRequest {
    pub url: Option<String>,
    #[serde(default = "default_scroll_attempts")]
    pub scroll_attempts: u32,
    #[serde(default = "default_wait_between_scrolls")]
    pub wait_between_scrolls: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserExtractRequest {
    pub url: Option<String>,
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,
    #[serde(default = "default_scroll_delay")]
    pub scroll_delay: u64,
    #[serde(default = "default_wait_after_scroll")]
    pub wait_after_scroll: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub image_urls: Vec<String>,
}

fn default_wait_time() -> u64 {
    5000
}

fn default_scroll_attempts() -> u32 {
    3
}

fn default_wait_between_scrolls() -> u64 {
    2000
}

fn default_max_scrolls() -> u32 {
    5
}

fn default_scroll_delay() -> u64 {
    2000
}

fn default_wait_after_scroll() -> u64 {
    1000
}

// ── Result records ───────────────────────────────────────────────────────────

/// One distinct image found on the page, keyed by its normalized `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub url: String,
    pub alt_text: String,
    pub file_type: String,
    pub provenance: String,
    pub pass_index: i64,
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub images: Vec<ImageRecord>,
    pub total: usize,
    pub url: String,
    pub source_stats: BTreeMap<String, usize>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_stats: Option<BTreeMap<i64, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_stats: Option<BTreeMap<i64, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_stats: Option<BTreeMap<i64, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_between_scrolls: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scrolls: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_after_scroll: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub images: Vec<DownloadedImage>,
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
