// src/checker/html.rs
// =============================================================================
// This module turns raw href values into a clean candidate set for the
// LinkValidator, and measures visible text for the content-depth pass.
//
// Candidate filtering, in order:
// 1. Skip empty hrefs, in-page anchors (#...), javascript:, mailto:, tel:
// 2. Resolve relative references against the page URL
// 3. Keep only http/https targets that match the requested scope
// 4. Drop fragments and duplicates (first occurrence wins)
// 5. Cap the set so one page can't blow up the audit time
// =============================================================================

use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Which side of the host boundary a validation pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    /// Same host as the audited page
    Internal,
    /// Any other host
    External,
}

impl LinkScope {
    fn matches(self, page: &Url, link: &Url) -> bool {
        let same_host = page.host_str() == link.host_str();
        match self {
            LinkScope::Internal => same_host,
            LinkScope::External => !same_host,
        }
    }
}

// Builds the candidate list for one validation pass
//
// Parameters:
//   hrefs: raw href attribute values in document order
//   page: the audited page (base for relative links, host for scope)
//   scope: internal or external pass
//   max: cap on the number of candidates returned
pub fn collect_candidates(hrefs: &[String], page: &Url, scope: LinkScope, max: usize) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for href in hrefs {
        if candidates.len() >= max {
            break;
        }

        let Some(mut link) = resolve_link(page, href) else {
            continue;
        };

        if !is_checkable_link(&link) || !scope.matches(page, &link) {
            continue;
        }

        // /docs and /docs#intro are the same target
        link.set_fragment(None);

        if seen.insert(link.as_str().to_string()) {
            candidates.push(link);
        }
    }

    candidates
}

// Resolves a link (possibly relative) to an absolute URL
//
// Returns None for anchors, special protocols and unparseable values
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || has_scheme(href, "mailto:")
        || has_scheme(href, "tel:")
        || has_scheme(href, "javascript:")
    {
        return None;
    }

    base.join(href).ok()
}

fn has_scheme(href: &str, scheme: &str) -> bool {
    href.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

fn is_checkable_link(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

// Counts the characters a visitor would actually read on a page
//
// Text inside <script>, <style>, <noscript> and <template> is ignored and
// runs of whitespace count as a single character.
pub fn visible_text_len(html: &str) -> usize {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();

    let root = match document.select(&body_selector).next() {
        Some(body) => body,
        None => document.root_element(),
    };

    let mut text = String::new();
    collect_visible_text(root, &mut text);

    text.split_whitespace()
        .map(|word| word.chars().count())
        .sum::<usize>()
        + text.split_whitespace().count().saturating_sub(1)
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if matches!(el.name(), "script" | "style" | "noscript" | "template") {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_visible_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/page/").unwrap()
    }

    fn hrefs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_skips_special_links() {
        let input = hrefs(&[
            "",
            "#top",
            "javascript:void(0)",
            "MAILTO:a@example.com",
            "tel:+420123",
            "/docs",
        ]);
        let links = collect_candidates(&input, &page(), LinkScope::Internal, 50);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/docs");
    }

    #[test]
    fn test_resolves_relative_and_dedupes() {
        let input = hrefs(&["../about", "https://example.com/about", "/about#team", "sub"]);
        let links = collect_candidates(&input, &page(), LinkScope::Internal, 50);
        let links: Vec<&str> = links.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://example.com/about", "https://example.com/page/sub"]
        );
    }

    #[test]
    fn test_scope_partitions_hosts() {
        let input = hrefs(&["/a", "https://other.org/b", "https://example.com/c"]);
        let internal = collect_candidates(&input, &page(), LinkScope::Internal, 50);
        let external = collect_candidates(&input, &page(), LinkScope::External, 50);
        assert_eq!(internal.len(), 2);
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].as_str(), "https://other.org/b");
    }

    #[test]
    fn test_caps_candidate_count() {
        let input: Vec<String> = (0..20).map(|i| format!("/p{i}")).collect();
        let links = collect_candidates(&input, &page(), LinkScope::Internal, 5);
        assert_eq!(links.len(), 5);
        assert_eq!(links[4].as_str(), "https://example.com/p4");
    }

    #[test]
    fn test_skip_non_http_schemes() {
        let input = hrefs(&["ftp://example.com/file", "data:text/plain,hi"]);
        assert!(collect_candidates(&input, &page(), LinkScope::External, 50).is_empty());
    }

    #[test]
    fn test_visible_text_ignores_scripts() {
        let html = r#"<html><head><title>T</title></head><body>
            <script>var x = "lots of hidden text here";</script>
            <p>Hello   world</p>
            <style>.a { color: red }</style>
        </body></html>"#;
        assert_eq!(visible_text_len(html), "Hello world".len());
    }
}
