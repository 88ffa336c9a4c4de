//! Web page summarization.
//!
//! A [`PageSummarizer`] fetches one page, extracts its paragraph text and
//! title, and reduces the text to an extractive summary.
//!
//! # Submodules
//!
//! - [`extract`]: title and paragraph text from page markup
//! - [`textrank`]: sentence splitting and ranking
//!
//! # Failure kinds
//!
//! | Condition | Error |
//! |-----------|-------|
//! | URL is not absolute http/https | [`SummaryError::InvalidUrl`] |
//! | ratio outside `(0, 1)` | [`SummaryError::InvalidParameter`] |
//! | network error, timeout, non-2xx | [`SummaryError::Fetch`] |
//! | no paragraph text | [`SummaryError::NoContent`] |

pub mod extract;
pub mod textrank;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SummaryError;
use crate::models::{validate_url, PageSummary, Ratio};
use crate::utils::truncate_for_log;

/// Bytes of a response body kept for summarization; the rest is discarded.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Browser-like user agent; some sites refuse unidentified clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:73.0) Gecko/20100101 Firefox/73.0";

/// Anything that can turn a URL into a title and summary.
///
/// The queue depends on this trait rather than on [`PageSummarizer`] so that
/// tests can substitute canned pages.
pub trait Summarize {
    async fn summarize(&self, url: &str, ratio: f64) -> Result<PageSummary, SummaryError>;
}

/// Fetches pages over HTTP and summarizes them.
#[derive(Debug, Clone)]
pub struct PageSummarizer {
    client: Client,
}

impl PageSummarizer {
    /// Build a summarizer whose requests use `user_agent` and give up after `timeout`.
    ///
    /// The client keeps no cookies and no idle connections, so a fetch leaves
    /// nothing behind once it returns.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SummaryError> {
        let mut headers = HeaderMap::new();
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| SummaryError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the page markup, reading at most [`MAX_BODY_BYTES`].
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn fetch_html(&self, url: &Url) -> Result<String, SummaryError> {
        let t0 = Instant::now();
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SummaryError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::fetch(url.as_str(), format!("HTTP status {status}")));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SummaryError::fetch(url.as_str(), e))?
        {
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                warn!(limit = MAX_BODY_BYTES, "Page body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();
        debug!(
            bytes = html.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(html)
    }
}

impl Summarize for PageSummarizer {
    #[instrument(level = "info", skip(self))]
    async fn summarize(&self, url: &str, ratio: f64) -> Result<PageSummary, SummaryError> {
        let parsed = validate_url(url)?;
        let ratio = Ratio::new(ratio)?;
        let html = self.fetch_html(&parsed).await?;

        // Ranking is CPU-bound; keep it off the async workers.
        let page_url = url.to_string();
        tokio::task::spawn_blocking(move || summarize_html(&page_url, &html, ratio))
            .await
            .map_err(|e| {
                error!(%url, error = %e, "Summarization task failed");
                SummaryError::NoContent(url.to_string())
            })?
    }
}

/// Summarize already-fetched markup for `url`.
pub fn summarize_html(url: &str, html: &str, ratio: Ratio) -> Result<PageSummary, SummaryError> {
    let page = extract::extract_page(html);
    if page.body.trim().is_empty() {
        return Err(SummaryError::NoContent(url.to_string()));
    }

    let summary = textrank::summarize(&page.body, ratio.get());
    if summary.is_empty() {
        return Err(SummaryError::NoContent(url.to_string()));
    }

    info!(
        title = %page.title,
        body_bytes = page.body.len(),
        summary_bytes = summary.len(),
        summary_preview = %truncate_for_log(&summary, 120),
        "Summarized page"
    );
    Ok(PageSummary {
        title: page.title,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_html, serve_pages};

    fn summarizer() -> PageSummarizer {
        PageSummarizer::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_summarize_fetched_page() {
        let base = serve_pages().await;
        let result = summarizer()
            .summarize(&format!("{base}/article"), 0.3)
            .await
            .unwrap();
        assert_eq!(result.title, "Memory Safety");
        assert!(!result.summary.is_empty());
        assert!(article_html().contains(result.summary.split(". ").next().unwrap()));
    }

    #[tokio::test]
    async fn test_rejects_bad_ratio_before_fetching() {
        let s = summarizer();
        for ratio in [0.0, 1.0, -0.1, 1.5] {
            let err = s.summarize("http://127.0.0.1:9/never", ratio).await.unwrap_err();
            assert!(matches!(err, SummaryError::InvalidParameter(_)), "{ratio}: {err}");
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let err = summarizer().summarize("mailto:someone@example.com", 0.2).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let base = serve_pages().await;
        let err = summarizer()
            .summarize(&format!("{base}/missing"), 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::Fetch { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_page_without_paragraphs_is_no_content() {
        let base = serve_pages().await;
        let err = summarizer()
            .summarize(&format!("{base}/no-paragraphs"), 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::NoContent(_)), "{err}");
    }

    #[tokio::test]
    async fn test_sends_browser_user_agent() {
        let base = serve_pages().await;
        let result = summarizer()
            .summarize(&format!("{base}/agent-only"), 0.5)
            .await
            .unwrap();
        assert_eq!(result.title, "Welcome");
    }

    #[tokio::test]
    async fn test_oversized_body_is_truncated() {
        let base = serve_pages().await;
        let url = Url::parse(&format!("{base}/huge")).unwrap();
        let html = summarizer().fetch_html(&url).await.unwrap();
        assert_eq!(html.len(), MAX_BODY_BYTES);

        let result = summarizer().summarize(url.as_str(), 0.2).await.unwrap();
        assert_eq!(result.title, "Huge");
        assert!(!result.summary.is_empty());
    }

    #[test]
    fn test_summarize_html_longer_with_higher_ratio() {
        let html = article_html();
        let short = summarize_html("https://example.com", &html, Ratio::new(0.2).unwrap()).unwrap();
        let long = summarize_html("https://example.com", &html, Ratio::new(0.8).unwrap()).unwrap();
        assert!(long.summary.len() >= short.summary.len());
    }
}
