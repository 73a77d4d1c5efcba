//! Main-content text extraction from HTML

use scraper::{ElementRef, Html, Selector};

/// Elements whose text never belongs to the main content
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "footer", "aside",
];

/// Elements that start a new paragraph
const PARAGRAPH_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "ul", "ol", "table",
    "article", "section",
];

/// Elements that start a new line
const LINE_ELEMENTS: &[&str] = &["br", "div", "li", "tr", "dd", "dt", "header", "form", "hr"];

/// Minimum serialized size for a selector match to count as the main content
const MIN_MAIN_CONTENT_HTML: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Break {
    None,
    Line,
    Paragraph,
}

/// Extracts the main textual content of an HTML page
pub struct TextExtractor {
    /// Pre-compiled selectors for the main content area, in priority order
    content_selectors: Vec<Selector>,
    body_selector: Option<Selector>,
}

impl TextExtractor {
    pub fn new() -> Self {
        let content_selectors: Vec<Selector> = [
            "article",
            "main",
            "[role='main']",
            ".post-content",
            ".article-content",
            ".entry-content",
            ".content",
            "#content",
            ".post",
            ".article",
        ]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

        Self {
            content_selectors,
            body_selector: Selector::parse("body").ok(),
        }
    }

    /// Extract plain text from an HTML document
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let root = self.find_main_content(&document);
        Self::normalize_whitespace(&Self::collect_text(root))
    }

    /// Find the main content area, falling back to `<body>` and then the whole document
    fn find_main_content<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        for selector in &self.content_selectors {
            if let Some(element) = document.select(selector).next() {
                if element.html().len() > MIN_MAIN_CONTENT_HTML {
                    return element;
                }
            }
        }

        self.body_selector
            .as_ref()
            .and_then(|sel| document.select(sel).next())
            .unwrap_or_else(|| document.root_element())
    }

    fn collect_text(root: ElementRef<'_>) -> String {
        let mut text = String::new();
        let mut pending = Break::None;

        for node in root.descendants() {
            if let Some(text_node) = node.value().as_text() {
                let skipped = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map_or(false, |e| SKIPPED_ELEMENTS.contains(&e.name()))
                });
                if skipped {
                    continue;
                }

                let words: Vec<&str> = text_node.split_whitespace().collect();
                if words.is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    match pending {
                        Break::Paragraph => text.push_str("\n\n"),
                        Break::Line => text.push('\n'),
                        Break::None => text.push(' '),
                    }
                }
                text.push_str(&words.join(" "));
                pending = Break::None;
            } else if let Some(elem) = node.value().as_element() {
                let name = elem.name();
                if PARAGRAPH_ELEMENTS.contains(&name) {
                    pending = pending.max(Break::Paragraph);
                } else if LINE_ELEMENTS.contains(&name) {
                    pending = pending.max(Break::Line);
                }
            }
        }

        text
    }

    /// Collapse runs of spaces on each line, keep paragraph breaks (double
    /// newlines), drop empty lines.
    fn normalize_whitespace(text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut consecutive_newlines = 0u32;

        for line in text.split('\n') {
            let trimmed = line.split_whitespace().collect::<Vec<_>>().join(" ");

            if trimmed.is_empty() {
                consecutive_newlines += 1;
                continue;
            }

            if !result.is_empty() {
                if consecutive_newlines >= 1 {
                    result.push_str("\n\n");
                } else {
                    result.push('\n');
                }
            }

            consecutive_newlines = 0;
            result.push_str(&trimmed);
        }

        result
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}
