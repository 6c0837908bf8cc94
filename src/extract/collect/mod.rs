//! Candidate collection over a DOM-like surface.
//!
//! Every construct that can carry an image reference has one rule in
//! [`RULES`]. Rules only see the [`DomSurface`] capability, so the same
//! registry runs over a parsed HTML document and over a snapshot of a live
//! browser page.

mod live;
mod rules;
mod static_page;

pub use live::{LiveSnapshot, SnapshotElement, SNAPSHOT_SCRIPT};
pub use static_page::StaticPage;

/// A raw, unverified image reference and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub raw_src: String,
    pub alt_text: String,
    pub provenance: String,
}

impl ImageCandidate {
    pub fn new(
        raw_src: impl Into<String>,
        alt_text: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            raw_src: raw_src.into(),
            alt_text: alt_text.into(),
            provenance: provenance.into(),
        }
    }
}

pub trait DomElement {
    /// Lower-case tag name.
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
    fn attributes(&self) -> Vec<(&str, &str)>;
    /// Concatenated text content; the raw body for `style`, `script` and `noscript`.
    fn text(&self) -> String;
    /// Resolved `background-image`, when the surface can compute styles.
    fn computed_background(&self) -> Option<&str> {
        None
    }
}

pub trait DomSurface {
    /// Elements with the given tag name in document order, or every element for `None`.
    fn elements(&self, tag: Option<&str>) -> Vec<Box<dyn DomElement + '_>>;
}

pub type CollectFn = fn(&dyn DomSurface, &mut Vec<ImageCandidate>);

/// One construct handler in the collection registry.
pub struct CollectRule {
    pub name: &'static str,
    pub collect: CollectFn,
}

/// Applied in order; the first rule to surface a URL decides its provenance.
pub static RULES: &[CollectRule] = &[
    CollectRule { name: "image-elements", collect: rules::image_elements },
    CollectRule { name: "picture-sources", collect: rules::picture_sources },
    CollectRule { name: "noscript-fallbacks", collect: rules::noscript_fallbacks },
    CollectRule { name: "inline-style-backgrounds", collect: rules::inline_style_backgrounds },
    CollectRule { name: "computed-backgrounds", collect: rules::computed_backgrounds },
    CollectRule { name: "stylesheet-blocks", collect: rules::stylesheet_blocks },
    CollectRule { name: "json-ld", collect: rules::json_ld },
    CollectRule { name: "script-literals", collect: rules::script_literals },
    CollectRule { name: "meta-tags", collect: rules::meta_tags },
    CollectRule { name: "video-posters", collect: rules::video_posters },
    CollectRule { name: "link-icons", collect: rules::link_icons },
    CollectRule { name: "data-backgrounds", collect: rules::data_backgrounds },
    CollectRule { name: "data-attributes", collect: rules::data_attributes },
];

pub fn collect_candidates(surface: &dyn DomSurface) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();
    for rule in RULES {
        let before = candidates.len();
        (rule.collect)(surface, &mut candidates);
        tracing::trace!(rule = rule.name, found = candidates.len() - before, "collector rule applied");
    }
    candidates
}
