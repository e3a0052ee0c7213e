//! HTML boundary used by scrape strategies.
//!
//! Exposes the small query surface strategies need: find first/all descendant
//! elements by tag + class, read normalized text, read an attribute. Missing
//! elements come back as `None` or an empty list, never as an error.

use scraper::{ElementRef, Html, Selector};

pub struct HtmlDocument {
    html: Html,
}

#[derive(Clone, Copy)]
pub struct HtmlNode<'a> {
    element: ElementRef<'a>,
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    pub fn find_all(&self, tag: &str, class: &str) -> Vec<HtmlNode<'_>> {
        match selector(tag, class) {
            Some(sel) => self
                .html
                .select(&sel)
                .map(|element| HtmlNode { element })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn find_first(&self, tag: &str, class: &str) -> Option<HtmlNode<'_>> {
        let sel = selector(tag, class)?;
        self.html.select(&sel).next().map(|element| HtmlNode { element })
    }
}

impl<'a> HtmlNode<'a> {
    pub fn find_first(&self, tag: &str, class: &str) -> Option<HtmlNode<'a>> {
        let sel = selector(tag, class)?;
        self.element
            .select(&sel)
            .next()
            .map(|element| HtmlNode { element })
    }

    /// Concatenated descendant text with whitespace collapsed and trimmed.
    pub fn text(&self) -> String {
        let raw: String = self.element.text().collect();
        normalize_ws(&raw)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }
}

/// `tag.class` selector; an empty class matches on tag alone. Inputs that do
/// not form a valid selector behave like "no such element".
fn selector(tag: &str, class: &str) -> Option<Selector> {
    let css = if class.is_empty() {
        tag.to_string()
    } else {
        format!("{tag}.{class}")
    };
    Selector::parse(&css).ok()
}

/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
