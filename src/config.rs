use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::extract::classify::PathPatternSet;

const ENV_PREFIX: &str = "IMAGE_EXTRACTOR_";

/// Service settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub insecure_ssl: bool,
    pub fetch_timeout: Duration,
    pub navigation_timeout: Duration,
    pub chromium_path: Option<PathBuf>,
    pub browser_no_sandbox: bool,
    pub basic_patterns: PathPatternSet,
    pub max_passes: u32,
    pub max_scrolls: u32,
    pub max_delay_ms: u64,
    pub max_downloads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            insecure_ssl: false,
            fetch_timeout: Duration::from_millis(15_000),
            navigation_timeout: Duration::from_millis(30_000),
            chromium_path: None,
            browser_no_sandbox: false,
            basic_patterns: PathPatternSet::Conservative,
            max_passes: 10,
            max_scrolls: 20,
            max_delay_ms: 30_000,
            max_downloads: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset or malformed keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            listen_addr: get("ADDR").unwrap_or(defaults.listen_addr),
            insecure_ssl: get("INSECURE_SSL").as_deref() == Some("1"),
            fetch_timeout: Duration::from_millis(parse_or(
                "FETCH_TIMEOUT_MS",
                get("FETCH_TIMEOUT_MS"),
                15_000,
            )),
            navigation_timeout: Duration::from_millis(parse_or(
                "NAV_TIMEOUT_MS",
                get("NAV_TIMEOUT_MS"),
                30_000,
            )),
            chromium_path: get("CHROMIUM_PATH").map(PathBuf::from),
            browser_no_sandbox: get("BROWSER_NO_SANDBOX").as_deref() == Some("1"),
            basic_patterns: parse_or(
                "BASIC_PATTERNS",
                get("BASIC_PATTERNS"),
                defaults.basic_patterns,
            ),
            max_passes: parse_or("MAX_PASSES", get("MAX_PASSES"), defaults.max_passes),
            max_scrolls: parse_or("MAX_SCROLLS", get("MAX_SCROLLS"), defaults.max_scrolls),
            max_delay_ms: parse_or("MAX_DELAY_MS", get("MAX_DELAY_MS"), defaults.max_delay_ms),
            max_downloads: parse_or("MAX_DOWNLOADS", get("MAX_DOWNLOADS"), defaults.max_downloads),
        }
    }

    pub fn clamp_delay(&self, ms: u64) -> Duration {
        Duration::from_millis(ms.min(self.max_delay_ms))
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %format!("{ENV_PREFIX}{name}"), value = %raw, "ignoring unparseable setting");
            default
        }),
    }
}
