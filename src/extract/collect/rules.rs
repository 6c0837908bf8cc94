use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{DomElement, DomSurface, ImageCandidate, StaticPage};

// ── Constants ────────────────────────────────────────────────────────────────

/// `src` followed by the lazy-loading attributes used by common loaders.
const IMG_ATTRIBUTES: &[&str] = &[
    "src",
    "srcset",
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-srcset",
    "data-lazy",
    "data-echo",
    "data-img",
    "data-lazy-img",
    "data-defer-src",
    "data-actual",
    "data-hi-res-src",
    "data-low-res-src",
    "data-medium-res-src",
    "data-retina-src",
    "data-2x",
    "data-1x",
    "data-mobile-src",
    "data-desktop-src",
    "data-tablet-src",
    "data-phone-src",
    "data-full-src",
    "data-thumb-src",
    "data-preview-src",
    "data-zoom-src",
    "data-large-src",
    "data-small-src",
];

const SOURCE_ATTRIBUTES: &[&str] = &["srcset", "src", "data-srcset", "data-src"];

const POSTER_ATTRIBUTES: &[&str] = &["poster", "data-poster"];

const DATA_BACKGROUND_ATTRIBUTES: &[&str] = &["data-bg", "data-background", "data-background-image"];

const META_IMAGE_KEYS: &[&str] = &["property", "name", "itemprop"];

const JSONLD_IMAGE_KEYS: &[&str] = &["image", "thumbnailUrl", "logo"];

const DATA_PATH_NEEDLES: &[&str] = &["/image/", "/img/", "/photo/"];

// ── Lazy static regexes ──────────────────────────────────────────────────────

static CSS_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());

static STYLESHEET_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)background-image\s*:\s*url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#,
        r#"(?i)background\s*:\s*[^;{}]*url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#,
        r#"(?i)content\s*:\s*url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#,
        r#"(?i)@media[^{]*\{[^{}]*\{[^{}]*background[^{}]*url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const EXT: &str = "(?:jpg|jpeg|png|gif|webp|svg|bmp|ico|avif|tiff?)";

/// Script patterns; the flag marks patterns whose match is discarded when a
/// colon follows it, since it is then an object key rather than a value.
static SCRIPT_RES: Lazy<Vec<(Regex, bool)>> = Lazy::new(|| {
    [
        (format!(r#"(?i)['"]([^'"]*\.{EXT}[^'"]*)['"]"#), true),
        (
            format!(
                r#"(?i)(?:src|image|img|photo|picture|thumbnail|avatar|banner|logo|background)\s*[=:]\s*['"]([^'"]+\.{EXT}[^'"]*)['"]"#
            ),
            true,
        ),
        (format!(r#"(?i)\[\s*['"]([^'"]*\.{EXT}[^'"]*)['"]\s*\]"#), false),
        (format!(r#"(?i)new\s+URL\s*\(\s*['"]([^'"]*\.{EXT}[^'"]*)['"]"#), true),
        (format!(r#"(?i)`([^`]*\.{EXT}[^`]*)`"#), false),
    ]
    .into_iter()
    .map(|(p, key_guard)| (Regex::new(&p).unwrap(), key_guard))
    .collect()
});

static DATA_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\.{EXT}(?:$|\?|#)")).unwrap());

// ── Element rules ────────────────────────────────────────────────────────────

pub(super) fn image_elements(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for img in surface.elements(Some("img")) {
        push_image_element(img.as_ref(), |attr| format!("img-{attr}"), "Image", out);
    }
}

pub(super) fn picture_sources(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for source in surface.elements(Some("source")) {
        for attr in SOURCE_ATTRIBUTES {
            if let Some(value) = source.attr(attr) {
                push_attribute_value(attr, value, "Picture Source", &format!("picture-{attr}"), out);
            }
        }
    }
}

pub(super) fn noscript_fallbacks(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for noscript in surface.elements(Some("noscript")) {
        let body = noscript.text();
        if !body.contains('<') {
            continue;
        }
        let nested = StaticPage::parse_fragment(&body);
        for img in nested.elements(Some("img")) {
            push_image_element(img.as_ref(), |_| "noscript-img".to_string(), "Noscript Image", out);
        }
    }
}

pub(super) fn video_posters(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for video in surface.elements(Some("video")) {
        for attr in POSTER_ATTRIBUTES {
            if let Some(value) = non_empty(video.attr(attr)) {
                out.push(ImageCandidate::new(value, "Video Poster", format!("video-{attr}")));
            }
        }
    }
}

pub(super) fn meta_tags(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for meta in surface.elements(Some("meta")) {
        let names_image = META_IMAGE_KEYS.iter().any(|key| {
            meta.attr(key)
                .map(|v| v.to_ascii_lowercase().contains("image"))
                .unwrap_or(false)
        });
        if !names_image {
            continue;
        }
        if let Some(content) = non_empty(meta.attr("content")) {
            out.push(ImageCandidate::new(content, "Meta Image", "meta-tag"));
        }
    }
}

pub(super) fn link_icons(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for link in surface.elements(Some("link")) {
        let rel = link.attr("rel").unwrap_or_default().to_ascii_lowercase();
        if !(rel.contains("icon") || rel.contains("apple-touch")) {
            continue;
        }
        if let Some(href) = non_empty(link.attr("href")) {
            out.push(ImageCandidate::new(href, "Icon", "link-icon"));
        }
    }
}

// ── Style rules ──────────────────────────────────────────────────────────────

pub(super) fn inline_style_backgrounds(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for el in surface.elements(None) {
        let Some(style) = el.attr("style") else {
            continue;
        };
        for declaration in style_declarations(style) {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            if !property.trim().to_ascii_lowercase().starts_with("background") {
                continue;
            }
            for url in css_urls(value) {
                out.push(ImageCandidate::new(url, "Background Image", "style-background"));
            }
        }
    }
}

pub(super) fn computed_backgrounds(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for el in surface.elements(None) {
        if let Some(background) = el.computed_background() {
            for url in css_urls(background) {
                out.push(ImageCandidate::new(url, "Background Image", "css-background"));
            }
        }
    }
}

pub(super) fn stylesheet_blocks(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for style in surface.elements(Some("style")) {
        let css = style.text();
        for re in STYLESHEET_RES.iter() {
            for caps in re.captures_iter(&css) {
                out.push(ImageCandidate::new(caps[1].trim(), "CSS Image", "css-style"));
            }
        }
    }
}

// ── Script rules ─────────────────────────────────────────────────────────────

pub(super) fn json_ld(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for script in surface.elements(Some("script")) {
        if !is_json_ld(script.as_ref()) {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(script.text().trim()) else {
            continue;
        };
        let mut urls = Vec::new();
        jsonld_images(&value, &mut urls);
        for url in urls {
            out.push(ImageCandidate::new(url, "Structured Data Image", "script-json"));
        }
    }
}

pub(super) fn script_literals(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for script in surface.elements(Some("script")) {
        let body = script.text();
        for (re, key_guard) in SCRIPT_RES.iter() {
            for caps in re.captures_iter(&body) {
                let whole = caps.get(0).map(|m| m.end()).unwrap_or(body.len());
                if *key_guard && body[whole..].trim_start().starts_with(':') {
                    continue;
                }
                let url = &caps[1];
                if url.starts_with("data:") {
                    continue;
                }
                out.push(ImageCandidate::new(url, "Script Image", "javascript"));
            }
        }
    }
}

// ── Data attribute rules ─────────────────────────────────────────────────────

pub(super) fn data_backgrounds(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for el in surface.elements(None) {
        for attr in DATA_BACKGROUND_ATTRIBUTES {
            if let Some(value) = non_empty(el.attr(attr)) {
                out.push(ImageCandidate::new(value, "Data Background", "data-background"));
            }
        }
    }
}

pub(super) fn data_attributes(surface: &dyn DomSurface, out: &mut Vec<ImageCandidate>) {
    for el in surface.elements(None) {
        for (name, value) in el.attributes() {
            if !name.starts_with("data-") || value.is_empty() {
                continue;
            }
            let looks_like_image = DATA_VALUE_RE.is_match(value)
                || DATA_PATH_NEEDLES.iter().any(|needle| value.contains(needle));
            if looks_like_image {
                out.push(ImageCandidate::new(value, format!("Data: {name}"), "data-attribute"));
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn push_image_element(
    img: &dyn DomElement,
    provenance: impl Fn(&str) -> String,
    default_alt: &str,
    out: &mut Vec<ImageCandidate>,
) {
    let alt = non_empty(img.attr("alt")).unwrap_or(default_alt);
    for attr in IMG_ATTRIBUTES {
        if let Some(value) = img.attr(attr) {
            push_attribute_value(attr, value, alt, &provenance(attr), out);
        }
    }
}

fn push_attribute_value(
    attr: &str,
    value: &str,
    alt: &str,
    provenance: &str,
    out: &mut Vec<ImageCandidate>,
) {
    if attr.ends_with("srcset") {
        for url in srcset_urls(value) {
            out.push(ImageCandidate::new(url, alt, provenance));
        }
    } else if let Some(value) = non_empty(Some(value)) {
        out.push(ImageCandidate::new(value, alt, provenance));
    }
}

/// URL token of each comma-separated srcset entry, descriptors dropped.
pub(super) fn srcset_urls(srcset: &str) -> Vec<&str> {
    srcset
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .collect()
}

/// Split an inline style on `;`, ignoring semicolons inside quotes or
/// parentheses such as `url('/a.jpg;v=2')`.
fn style_declarations(style: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&style[start..]);
    declarations
}

fn css_urls(value: &str) -> Vec<&str> {
    CSS_URL_RE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|url| !url.is_empty())
        .collect()
}

fn is_json_ld(script: &dyn DomElement) -> bool {
    script
        .attr("type")
        .map(|t| t.to_ascii_lowercase().contains("ld+json"))
        .unwrap_or(false)
}

fn jsonld_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if JSONLD_IMAGE_KEYS.contains(&key.as_str()) {
                    jsonld_image_value(nested, out);
                } else {
                    jsonld_images(nested, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                jsonld_images(item, out);
            }
        }
        _ => {}
    }
}

fn jsonld_image_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                jsonld_image_value(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(Value::String(u)) = obj.get("url").or_else(|| obj.get("contentUrl")) {
                out.push(u.clone());
            }
        }
        _ => {}
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
