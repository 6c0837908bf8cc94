use scraper::{ElementRef, Html, Selector};

use super::{DomElement, DomSurface};

/// A parsed HTML document, as served by the origin.
pub struct StaticPage {
    document: Html,
}

impl StaticPage {
    pub fn parse_document(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn parse_fragment(html: &str) -> Self {
        Self {
            document: Html::parse_fragment(html),
        }
    }
}

impl DomSurface for StaticPage {
    fn elements(&self, tag: Option<&str>) -> Vec<Box<dyn DomElement + '_>> {
        let Ok(selector) = Selector::parse(tag.unwrap_or("*")) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|el| Box::new(ScraperElement(el)) as Box<dyn DomElement + '_>)
            .collect()
    }
}

struct ScraperElement<'a>(ElementRef<'a>);

impl DomElement for ScraperElement<'_> {
    fn tag(&self) -> &str {
        self.0.value().name()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.0.value().attr(name)
    }

    fn attributes(&self) -> Vec<(&str, &str)> {
        self.0.value().attrs().collect()
    }

    fn text(&self) -> String {
        self.0.text().collect()
    }
}
