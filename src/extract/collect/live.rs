use serde::{Deserialize, Serialize};

use super::{DomElement, DomSurface};

/// In-page script producing a [`LiveSnapshot`]: every element with its
/// attributes, raw bodies of `style`/`script`/`noscript`, and the resolved
/// `background-image` so stylesheet-applied backgrounds are visible.
pub const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const bodies = new Set(['style', 'script', 'noscript']);
  const elements = [];
  for (const el of document.querySelectorAll('*')) {
    const tag = el.tagName.toLowerCase();
    const attrs = [];
    for (const a of el.attributes) attrs.push([a.name, a.value]);
    let background = null;
    try {
      const bg = window.getComputedStyle(el).backgroundImage;
      if (bg && bg !== 'none') background = bg;
    } catch (e) {}
    elements.push({
      tag,
      attrs,
      text: bodies.has(tag) ? el.textContent : null,
      background,
    });
  }
  return { elements };
})()"#;

/// Element list sampled from a rendered page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub elements: Vec<SnapshotElement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotElement {
    pub tag: String,
    #[serde(default)]
    pub attrs: Vec<(String, String)>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

impl SnapshotElement {
    pub fn new(tag: &str, attrs: &[(&str, &str)]) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: None,
            background: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_background(mut self, background: &str) -> Self {
        self.background = Some(background.to_string());
        self
    }
}

impl DomSurface for LiveSnapshot {
    fn elements(&self, tag: Option<&str>) -> Vec<Box<dyn DomElement + '_>> {
        self.elements
            .iter()
            .filter(|el| tag.map_or(true, |t| el.tag == t))
            .map(|el| Box::new(el) as Box<dyn DomElement + '_>)
            .collect()
    }
}

impl DomElement for &SnapshotElement {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn attributes(&self) -> Vec<(&str, &str)> {
        self.attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn text(&self) -> String {
        self.text.clone().unwrap_or_default()
    }

    fn computed_background(&self) -> Option<&str> {
        self.background.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::collect::collect_candidates;

    #[test]
    fn deserializes_script_output() {
        let raw = serde_json::json!({
            "elements": [
                {"tag": "img", "attrs": [["src", "/a.jpg"], ["alt", "A"]], "text": null, "background": null},
                {"tag": "div", "attrs": [], "text": null, "background": "url(\"https://ex.com/bg.png\")"}
            ]
        });
        let snapshot: LiveSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snapshot.elements.len(), 2);
        assert_eq!(snapshot.elements[0].attrs[1], ("alt".to_string(), "A".to_string()));
    }

    #[test]
    fn computed_backgrounds_are_collected() {
        let snapshot = LiveSnapshot {
            elements: vec![
                SnapshotElement::new("div", &[])
                    .with_background(r#"url("https://ex.com/hero.jpg"), linear-gradient(red, blue)"#),
                SnapshotElement::new("img", &[("data-src", "/lazy.png")]),
            ],
        };
        let candidates = collect_candidates(&snapshot);
        assert!(candidates
            .iter()
            .any(|c| c.provenance == "css-background" && c.raw_src == "https://ex.com/hero.jpg"));
        assert!(candidates
            .iter()
            .any(|c| c.provenance == "img-data-src" && c.raw_src == "/lazy.png"));
    }

    #[test]
    fn style_and_script_text_is_scanned() {
        let snapshot = LiveSnapshot {
            elements: vec![
                SnapshotElement::new("style", &[]).with_text(".hero{background-image:url(/img/h.png)}"),
                SnapshotElement::new("script", &[]).with_text(r#"var poster = "/media/poster.webp";"#),
            ],
        };
        let candidates = collect_candidates(&snapshot);
        assert!(candidates
            .iter()
            .any(|c| c.provenance == "css-style" && c.raw_src == "/img/h.png"));
        assert!(candidates
            .iter()
            .any(|c| c.provenance == "javascript" && c.raw_src == "/media/poster.webp"));
    }

    #[test]
    fn filters_by_tag() {
        let snapshot = LiveSnapshot {
            elements: vec![
                SnapshotElement::new("img", &[]),
                SnapshotElement::new("video", &[]),
                SnapshotElement::new("img", &[]),
            ],
        };
        assert_eq!(snapshot.elements(Some("img")).len(), 2);
        assert_eq!(snapshot.elements(None).len(), 3);
    }
}
