// src/audit/page.rs
// =============================================================================
// Extracts everything the check battery needs from a page's HTML in a single
// parse. scraper's `Html` is not Send, so it never lives across an .await:
// the auditor calls `PageFacts::from_html` and gets plain owned data back.
// =============================================================================

use scraper::{Html, Selector};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Text of the first <h1>, whitespace collapsed
    pub first_h1: Option<String>,
    pub h1_count: usize,
    pub og_image: Option<String>,
    /// Elements with "btn" in their class and an empty or "#" href
    pub bad_buttons: usize,
    /// Raw href values of every <a href>, in document order
    pub hrefs: Vec<String>,
}

impl PageFacts {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);

        // These selectors are constants, so parse failures are programmer errors
        let title_sel = Selector::parse("title").unwrap();
        let h1_sel = Selector::parse("h1").unwrap();
        let btn_sel = Selector::parse(r#"[class*="btn"]"#).unwrap();
        let link_sel = Selector::parse("a[href]").unwrap();

        let title = document
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let h1_count = document.select(&h1_sel).count();
        let first_h1 = document
            .select(&h1_sel)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let bad_buttons = document
            .select(&btn_sel)
            .filter(|el| {
                let href = el.value().attr("href").unwrap_or("").trim();
                href.is_empty() || href == "#"
            })
            .count();

        let hrefs = document
            .select(&link_sel)
            .filter_map(|el| el.value().attr("href"))
            .map(str::to_string)
            .collect();

        PageFacts {
            title,
            description: meta_content(&document, r#"meta[name="description"]"#),
            keywords: meta_content(&document, r#"meta[name="keywords"]"#),
            first_h1,
            h1_count,
            og_image: meta_content(&document, r#"meta[property="og:image"]"#),
            bad_buttons,
            hrefs,
        }
    }
}

// Content attribute of the first match, None when missing or blank
fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
