//! Visible-text extraction from arbitrary HTML pages.
//!
//! Only paragraphs and headings are kept, in document order. Navigation,
//! scripts, styles and attributes never reach the output.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

/// Separator placed between extracted blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

static BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, h4, h5, h6").expect("valid selector"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

/// Elements whose text is never rendered.
const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "template"];

/// Text pulled out of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// Trimmed `<title>` text, if the page has a non-empty one.
    pub title: Option<String>,
    /// Paragraph and heading text in document order.
    pub blocks: Vec<String>,
}

impl PageText {
    /// All blocks joined with [`BLOCK_SEPARATOR`].
    pub fn content(&self) -> String {
        self.blocks.join(BLOCK_SEPARATOR)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Parse `html` and collect its title and text blocks.
///
/// Block text is normalized: surrounding whitespace is trimmed and blocks
/// left empty are dropped.
pub fn extract_text(html: &str) -> PageText {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let blocks = doc
        .select(&BLOCK_SELECTOR)
        .filter_map(|el| {
            let mut text = String::new();
            collect_visible_text(el, &mut text);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();

    PageText { title, blocks }
}

/// Append every descendant text node, skipping invisible subtrees.
fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if INVISIBLE.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}
