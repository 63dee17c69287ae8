
use std::borrow::Cow;

use scraper::{ElementRef, Html};

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Convert Confluence storage-format markup into a single line of plain text.
///
/// Script and style content is dropped, CDATA bodies (code macros) are kept
/// as text, block boundaries become word boundaries, and runs of whitespace
/// collapse to one space.
#[inline]
pub fn extract_text(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(&escape_cdata(markup));
    let mut content = String::new();
    extract_text_recursive(fragment.root_element(), &mut content);

    clean_text(&content)
}

/// Replace every CDATA section with its escaped body.
///
/// The HTML parser reads `<![CDATA[` as a bogus comment that ends at the
/// first `>`, so code bodies would be lost or cut short. An unterminated
/// section runs to the end of the markup.
fn escape_cdata(markup: &str) -> Cow<'_, str> {
    if !markup.contains(CDATA_OPEN) {
        return Cow::Borrowed(markup);
    }

    let mut escaped = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some((before, section)) = rest.split_once(CDATA_OPEN) {
        escaped.push_str(before);
        let (body, after) = section.split_once(CDATA_CLOSE).unwrap_or((section, ""));
        for c in body.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                _ => escaped.push(c),
            }
        }
        rest = after;
    }
    escaped.push_str(rest);

    Cow::Owned(escaped)
}

/// Recursively collect text nodes in document order
fn extract_text_recursive(element: ElementRef<'_>, content: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let tag_name = child_element.value().name();

            match tag_name {
                "script" | "style" | "noscript" | "template" => {}

                "br" | "hr" => content.push(' '),

                _ if is_block_element(tag_name) => {
                    content.push(' ');
                    extract_text_recursive(child_element, content);
                    content.push(' ');
                }

                _ => extract_text_recursive(child_element, content),
            }
        } else if let Some(text_node) = child.value().as_text() {
            content.push_str(text_node);
        }
    }
}

fn is_block_element(tag_name: &str) -> bool {
    matches!(
        tag_name,
        "p" | "div"
            | "section"
            | "article"
            | "blockquote"
            | "li"
            | "ul"
            | "ol"
            | "dd"
            | "dt"
            | "pre"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    ) || tag_name.starts_with("ac:")
}

/// Collapse every run of whitespace into a single space
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
