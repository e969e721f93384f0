// src/checker/http.rs
// =============================================================================
// This module checks if a single URL is alive by making HTTP requests.
//
// Key functionality:
// - Makes an HTTP HEAD request first (lightweight, no body download)
// - Retries with GET when the server answers 404 or 405 to HEAD, because
//   plenty of servers reject HEAD but serve the full request fine
// - Anything >= 400 after that, or any transport fault, is broken
// - The content probe downloads the body and measures its visible text
//
// The pool, the budget and the sampling live in validator.rs; this file only
// knows how to judge one link.
// =============================================================================

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::html::visible_text_len;

// Represents the status of a link after checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Final response was below 400
    Ok,
    /// Final response was 400 or above
    Broken,
    /// The probe did not finish within its own timeout
    Timeout,
    /// SSL/TLS certificate error
    SslError,
    /// Too many redirects (redirect loop)
    TooManyRedirects,
    /// Could not resolve hostname
    DnsError,
    /// Target answered, but with next to no readable text
    NoContent,
    /// Never checked because the pass budget ran out
    Unchecked,
    /// Other transport error
    Error,
}

// Represents the result of checking a single link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    pub status: LinkStatus,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkCheckResult {
    pub fn is_ok(&self) -> bool {
        self.status == LinkStatus::Ok
    }

    pub fn unchecked(url: &Url) -> Self {
        LinkCheckResult {
            url: url.to_string(),
            status: LinkStatus::Unchecked,
            message: Some("Validation budget exhausted".to_string()),
        }
    }
}

// Checks that a link resolves
//
// Parameters:
//   client: shared reqwest client (cheap to clone, pools connections)
//   url: the link to check
//   timeout: budget for HEAD plus the optional GET retry
pub async fn probe_link(client: Client, url: Url, timeout: Duration) -> LinkCheckResult {
    match tokio::time::timeout(timeout, head_then_get(&client, &url)).await {
        Ok(result) => result,
        Err(_) => LinkCheckResult {
            url: url.to_string(),
            status: LinkStatus::Timeout,
            message: Some("Request timed out".to_string()),
        },
    }
}

async fn head_then_get(client: &Client, url: &Url) -> LinkCheckResult {
    // First, try a HEAD request (faster, no body download)
    let status = match client.head(url.clone()).send().await {
        Ok(response) => response.status(),
        Err(e) => return categorize_error(url, e),
    };

    if !matches!(status, StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND) {
        return analyze_status(url, status);
    }

    // HEAD was rejected, ask for the real thing
    match client.get(url.clone()).send().await {
        Ok(response) => analyze_status(url, response.status()),
        Err(e) => categorize_error(url, e),
    }
}

// Checks that a link leads to a page with real content on it
//
// Same transport rules as probe_link, but always a GET, and a reachable page
// whose visible text is shorter than `min_chars` is flagged as NoContent.
pub async fn probe_content(
    client: Client,
    url: Url,
    timeout: Duration,
    min_chars: usize,
) -> LinkCheckResult {
    match tokio::time::timeout(timeout, fetch_and_measure(&client, &url, min_chars)).await {
        Ok(result) => result,
        Err(_) => LinkCheckResult {
            url: url.to_string(),
            status: LinkStatus::Timeout,
            message: Some("Request timed out".to_string()),
        },
    }
}

async fn fetch_and_measure(client: &Client, url: &Url, min_chars: usize) -> LinkCheckResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return categorize_error(url, e),
    };

    let status = response.status();
    if status.as_u16() >= 400 {
        return analyze_status(url, status);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return categorize_error(url, e),
    };

    let length = visible_text_len(&body);
    if length < min_chars {
        LinkCheckResult {
            url: url.to_string(),
            status: LinkStatus::NoContent,
            message: Some(format!("Visible text: {} chars", length)),
        }
    } else {
        LinkCheckResult {
            url: url.to_string(),
            status: LinkStatus::Ok,
            message: Some(format!("Visible text: {} chars", length)),
        }
    }
}

// Anything below 400 counts as reachable; redirects were already followed
fn analyze_status(url: &Url, status_code: StatusCode) -> LinkCheckResult {
    let status = if status_code.as_u16() < 400 {
        LinkStatus::Ok
    } else {
        LinkStatus::Broken
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        message: Some(format!("HTTP {}", status_code.as_u16())),
    }
}

// Categorizes different error types from reqwest
fn categorize_error(url: &Url, error: reqwest::Error) -> LinkCheckResult {
    let error_string = error.to_string();

    let (status, message) = if error.is_timeout() {
        (LinkStatus::Timeout, "Request timed out".to_string())
    } else if error.is_redirect() {
        (LinkStatus::TooManyRedirects, "Too many redirects".to_string())
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if error_string.contains("dns") {
            (LinkStatus::DnsError, "Could not resolve hostname".to_string())
        } else {
            (LinkStatus::Error, "Connection failed".to_string())
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        (LinkStatus::SslError, "SSL certificate error".to_string())
    } else {
        (LinkStatus::Error, error_string)
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        message: Some(message),
    }
}
