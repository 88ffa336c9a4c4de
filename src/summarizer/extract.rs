//! Main-text extraction from page markup.
//!
//! The body text of a page is every `<p>` element's text in document order,
//! joined with single spaces. Pages that keep their content outside paragraph
//! markup yield an empty body.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Title and paragraph text of a parsed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub body: String,
}

pub fn extract_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let body = document
        .select(&PARAGRAPH)
        .map(|p| p.text().collect::<String>().split_whitespace().join(" "))
        .filter(|text| !text.is_empty())
        .join(" ");

    ExtractedPage { title, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_title_and_paragraphs_in_order() {
        let html = r#"<html><head><title>
            An Example Page
        </title></head><body>
            <h1>Heading is ignored</h1>
            <p>First paragraph.</p>
            <div><p>Second <b>bold</b>
               paragraph.</p></div>
            <p>Third.</p>
        </body></html>"#;
        let page = extract_page(html);
        assert_eq!(page.title, "An Example Page");
        assert_eq!(page.body, "First paragraph. Second bold paragraph. Third.");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let page = extract_page("<html><body><p>Text only.</p></body></html>");
        assert_eq!(page.title, "");
        assert_eq!(page.body, "Text only.");
    }

    #[test]
    fn test_no_paragraphs_yields_empty_body() {
        let page = extract_page(
            "<html><head><title>Divs</title></head><body><div>All in divs.</div></body></html>",
        );
        assert_eq!(page.title, "Divs");
        assert!(page.body.is_empty());
    }
}
