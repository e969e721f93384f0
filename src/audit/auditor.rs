// src/audit/auditor.rs
// =============================================================================
// PageAuditor: the facade that audits one URL.
//
// What happens per page:
// 1. Ask the renderer for the page (a load failure becomes a failing check)
// 2. Extract the page facts once
// 3. Run the head/body checks against those facts
// 4. Probe og:image if the page declares one
// 5. Hand internal and external links to the LinkValidator
//
// Only two things make audit() return Err: a URL that isn't an absolute
// http(s) URL, and a renderer that could not start. Everything else ends up
// as a CheckResult.
// =============================================================================

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::page::PageFacts;
use super::renderer::{Navigation, PageRenderer};
use super::{AuditResult, CheckResult};
use crate::checker::{LinkScope, LinkValidator};
use crate::config::AuditSettings;

const NOT_FOUND: &str = "Not found";

#[derive(Clone)]
pub struct PageAuditor {
    renderer: Arc<dyn PageRenderer>,
    validator: LinkValidator,
    settings: AuditSettings,
}

impl PageAuditor {
    pub fn new(renderer: Arc<dyn PageRenderer>, settings: AuditSettings) -> Result<Self> {
        let validator = LinkValidator::new(settings.links.clone())?;
        Ok(Self {
            renderer,
            validator,
            settings,
        })
    }

    pub async fn audit(&self, url: &str) -> Result<AuditResult> {
        let page_url = parse_page_url(url)?;
        let mut checks = Vec::new();

        let navigation = self
            .renderer
            .render(&page_url, self.settings.page_timeout)
            .await?;

        // After a failed load the remaining checks run against an empty document
        let (base_url, facts, evaluated) = match navigation {
            Navigation::Loaded(page) => {
                let loaded = page.status < 400;
                checks.push(CheckResult::new(
                    "Page loads",
                    loaded,
                    format!("HTTP {}", page.status),
                ));
                (page.final_url, PageFacts::from_html(&page.html), page.evaluated)
            }
            Navigation::Failed(message) => {
                debug!(url = %page_url, %message, "page failed to load");
                checks.push(CheckResult::new("Page loads", false, message));
                (page_url.clone(), PageFacts::default(), Vec::new())
            }
        };

        push_head_checks(&mut checks, &facts);
        push_body_checks(&mut checks, &facts);
        self.push_og_image_checks(&mut checks, &base_url, &facts).await;
        self.push_link_checks(&mut checks, &base_url, &facts).await;
        checks.extend(evaluated);

        let result = AuditResult::new(page_url.as_str(), checks);
        info!(
            url = %result.url,
            passed = result.passed(),
            total = result.checks.len(),
            "page audited"
        );
        Ok(result)
    }

    async fn push_og_image_checks(&self, checks: &mut Vec<CheckResult>, base: &Url, facts: &PageFacts) {
        let Some(og_image) = facts.og_image.as_deref() else {
            checks.push(CheckResult::new("og:image exists", false, NOT_FOUND));
            return;
        };

        checks.push(CheckResult::new("og:image exists", true, og_image));

        match base.join(og_image) {
            Ok(resolved) => {
                let probe = self.validator.probe(&resolved).await;
                checks.push(CheckResult::new(
                    "og:image returns 200",
                    probe.is_ok(),
                    format!("URL: {}", resolved),
                ));
            }
            Err(e) => checks.push(CheckResult::new(
                "og:image returns 200",
                false,
                format!("Invalid URL {}: {}", og_image, e),
            )),
        }
    }

    async fn push_link_checks(&self, checks: &mut Vec<CheckResult>, base: &Url, facts: &PageFacts) {
        let internal = self.validator.candidates(base, &facts.hrefs, LinkScope::Internal);
        let external = self.validator.candidates(base, &facts.hrefs, LinkScope::External);

        let report = self.validator.validate(internal.clone()).await;
        checks.push(CheckResult::new(
            "Internal links reachable",
            report.is_clean(),
            report.summary(),
        ));

        let report = self.validator.validate(external).await;
        checks.push(CheckResult::new(
            "External links reachable",
            report.is_clean(),
            report.summary(),
        ));

        if self.settings.content_depth {
            let report = self.validator.validate_content(internal).await;
            checks.push(CheckResult::new(
                "Internal links lead to content",
                report.is_clean(),
                report.summary(),
            ));
        }
    }
}

fn parse_page_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| anyhow!("Invalid URL '{}': {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(anyhow!("Invalid URL '{}': unsupported scheme {}", url, other)),
    }
}

fn push_head_checks(checks: &mut Vec<CheckResult>, facts: &PageFacts) {
    match &facts.title {
        Some(title) => {
            let len = title.chars().count();
            checks.push(CheckResult::new("Meta title exists", true, format!("Title: \"{}\"", title)));
            checks.push(CheckResult::new(
                "Title length 10-70",
                (10..=70).contains(&len),
                format!("Length: {}", len),
            ));
        }
        None => checks.push(CheckResult::new("Meta title exists", false, NOT_FOUND)),
    }

    match &facts.description {
        Some(desc) => {
            let len = desc.chars().count();
            checks.push(CheckResult::new(
                "Meta description exists",
                true,
                format!("Description: \"{}\"", desc),
            ));
            checks.push(CheckResult::new(
                "Description length 50-160",
                (50..=160).contains(&len),
                format!("Length: {}", len),
            ));
        }
        None => checks.push(CheckResult::new("Meta description exists", false, NOT_FOUND)),
    }

    match &facts.keywords {
        Some(keywords) => checks.push(CheckResult::new(
            "Meta keywords exist",
            true,
            format!("Keywords: \"{}\"", keywords),
        )),
        None => checks.push(CheckResult::new("Meta keywords exist", false, NOT_FOUND)),
    }
}

fn push_body_checks(checks: &mut Vec<CheckResult>, facts: &PageFacts) {
    match &facts.first_h1 {
        Some(h1) => checks.push(CheckResult::new(
            "H1 exists and is not empty",
            true,
            format!("H1: \"{}\"", h1),
        )),
        None => checks.push(CheckResult::new("H1 exists and is not empty", false, NOT_FOUND)),
    }

    checks.push(CheckResult::new(
        "Exactly one H1",
        facts.h1_count == 1,
        format!("H1 count: {}", facts.h1_count),
    ));

    let bad = facts.bad_buttons;
    checks.push(CheckResult::new(
        "All 'btn' elements have href",
        bad == 0,
        if bad == 0 { "OK".to_string() } else { format!("Invalid: {}", bad) },
    ));
}
