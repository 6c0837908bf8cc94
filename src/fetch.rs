use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::AppConfig;
use crate::error::ExtractionError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Header set sent with a page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// User agent only.
    Basic,
    /// Full browser-like navigation headers with caching disabled.
    NoCache,
    /// Navigation headers that shift per attempt so origins serve fresh,
    /// viewport-aware markup on re-samples.
    Sampling { attempt: u32 },
}

impl HeaderProfile {
    pub fn headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self == HeaderProfile::Basic {
            return headers;
        }

        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        match self {
            HeaderProfile::Sampling { attempt } if attempt > 0 => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
                headers.insert(
                    HeaderName::from_static("viewport-width"),
                    HeaderValue::from_static("1920"),
                );
                headers.insert(
                    HeaderName::from_static("viewport-height"),
                    HeaderValue::from_static("1080"),
                );
            }
            _ => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            }
        }

        if let HeaderProfile::Sampling { .. } = self {
            headers.insert(
                HeaderName::from_static("sec-fetch-dest"),
                HeaderValue::from_static("document"),
            );
            headers.insert(
                HeaderName::from_static("sec-fetch-mode"),
                HeaderValue::from_static("navigate"),
            );
            headers.insert(
                HeaderName::from_static("sec-fetch-site"),
                HeaderValue::from_static("none"),
            );
            headers.insert(
                header::UPGRADE_INSECURE_REQUESTS,
                HeaderValue::from_static("1"),
            );
        }
        headers
    }
}

/// HTML body of a successful fetch plus the URL it was served from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: Url,
}

// ── HTTP client ──────────────────────────────────────────────────────────────

pub fn build_client(config: &AppConfig) -> Result<reqwest::Client, ExtractionError> {
    let mut builder = reqwest::ClientBuilder::new()
        .connect_timeout(std::time::Duration::from_secs(5))
        .timeout(config.fetch_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(BROWSER_USER_AGENT);

    if config.insecure_ssl {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| ExtractionError::Request(e.to_string()))
}

pub async fn fetch_page(
    client: &reqwest::Client,
    url: &Url,
    profile: HeaderProfile,
) -> Result<FetchedPage, ExtractionError> {
    let response = client
        .get(url.as_str())
        .headers(profile.headers())
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractionError::Upstream {
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let html = response
        .text()
        .await
        .map_err(|e| ExtractionError::Request(e.to_string()))?;

    Ok(FetchedPage { html, final_url })
}

/// Raw body and content type of an arbitrary resource.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
) -> Result<(Vec<u8>, Option<String>), ExtractionError> {
    let parsed =
        Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(format!("{url}: {e}")))?;

    let response = client.get(parsed).send().await.map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractionError::Upstream {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractionError::Request(e.to_string()))?;

    Ok((bytes.to_vec(), content_type))
}

fn request_error(e: reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        ExtractionError::Request(format!("ConnectError: {}", e))
    } else {
        ExtractionError::Request(format!("RequestError: {}", e))
    }
}
