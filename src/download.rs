use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

use crate::error::ExtractionError;
use crate::fetch::fetch_bytes;
use crate::models::{DownloadResponse, DownloadedImage};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Fetch every URL in order and inline each body as a data URL.
///
/// A failed download is recorded and the next URL is still attempted.
pub async fn download_images(client: &reqwest::Client, urls: &[String]) -> DownloadResponse {
    let mut images = Vec::with_capacity(urls.len());

    for (n, url) in urls.iter().enumerate() {
        let record = match fetch_bytes(client, url).await {
            Ok((bytes, content_type)) => {
                let content_type = content_type
                    .filter(|ct| !ct.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                let filename = filename_for(url, &content_type, n + 1);
                tracing::debug!(url = %url, bytes = bytes.len(), %filename, "downloaded image");
                DownloadedImage {
                    url: url.clone(),
                    data: Some(format!("data:{content_type};base64,{}", STANDARD.encode(&bytes))),
                    filename: Some(filename),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "image download failed");
                DownloadedImage {
                    url: url.clone(),
                    data: None,
                    filename: None,
                    success: false,
                    error: Some(failure_message(&e)),
                }
            }
        };
        images.push(record);
    }

    let successful = images.iter().filter(|img| img.success).count();
    let total = images.len();
    DownloadResponse {
        images,
        successful,
        failed: total - successful,
        total,
    }
}

fn failure_message(e: &ExtractionError) -> String {
    match e {
        ExtractionError::Upstream { status } => {
            let reason = reqwest::StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason());
            match reason {
                Some(reason) => format!("HTTP {status}: {reason}"),
                None => format!("HTTP {status}"),
            }
        }
        other => other.to_string(),
    }
}

/// Last path segment of `url`, or `image_<n>`; an extension-less name gets
/// one derived from the content type.
fn filename_for(url: &str, content_type: &str, n: usize) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty());

    let mut filename = segment.unwrap_or_else(|| format!("image_{n}"));
    if !filename.contains('.') {
        filename.push('.');
        filename.push_str(&extension_for(content_type));
    }
    filename
}

fn extension_for(content_type: &str) -> String {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    let subtype = mime
        .split_once('/')
        .map(|(_, sub)| sub.split('+').next().unwrap_or(sub))
        .filter(|s| !s.is_empty());
    subtype.unwrap_or("jpg").to_ascii_lowercase()
}
