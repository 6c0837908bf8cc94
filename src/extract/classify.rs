use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico", "avif", "tiff", "tif",
];

pub const UNKNOWN_FILE_TYPE: &str = "unknown";

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:jpg|jpeg|png|gif|webp|svg|bmp|ico|avif|tiff|tif)(?:\?|#|$)").unwrap()
});

static CONSERVATIVE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/(?:image|img)/").unwrap());

static EXTENDED_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/(?:image|img|photos?|pictures?|media|assets|uploads?)/").unwrap()
});

/// Which directory names count as evidence that an extension-less URL is an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPatternSet {
    /// `/image/` and `/img/` only.
    Conservative,
    /// Adds photo, picture, media, assets and upload directories.
    Extended,
}

impl PathPatternSet {
    fn regex(self) -> &'static Regex {
        match self {
            PathPatternSet::Conservative => &CONSERVATIVE_PATH_RE,
            PathPatternSet::Extended => &EXTENDED_PATH_RE,
        }
    }
}

impl FromStr for PathPatternSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" | "basic" => Ok(PathPatternSet::Conservative),
            "extended" => Ok(PathPatternSet::Extended),
            other => Err(format!("unknown path pattern set: {other}")),
        }
    }
}

/// Returns the file type if `url` looks like an image, `None` otherwise.
///
/// Recall is preferred over precision: any path under a known image
/// directory is accepted even without an extension.
pub fn classify(url: &Url, patterns: PathPatternSet) -> Option<String> {
    let extension = path_extension(url);

    let by_extension = extension
        .as_deref()
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    let is_image = by_extension
        || EXTENSION_RE.is_match(url.as_str())
        || patterns.regex().is_match(url.path());

    if !is_image {
        return None;
    }
    Some(extension.unwrap_or_else(|| UNKNOWN_FILE_TYPE.to_string()))
}

/// Lower-cased extension of the last path segment, if it has one.
pub fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path().rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
