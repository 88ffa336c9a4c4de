//! Data models shared by the summarizer, the queue, and the delivery driver.
//!
//! - [`WebpageRecord`]: one queued web page, keyed by its URL
//! - [`RecordState`]: whether the record still waits for extraction
//! - [`PageSummary`]: the title and summary computed for a page
//! - [`Ratio`]: a validated summarization ratio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use url::Url;

use crate::errors::SummaryError;

/// Ratio used whenever none is given or the configured one is out of range.
pub const DEFAULT_RATIO: f64 = 0.2;

/// Persisted lifecycle state of a queued page.
///
/// A record moves from `Pending` to `Ready` exactly once. Delivered records
/// are tracked by the delivery driver, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    Ready,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordState::Pending),
            "ready" => Some(RecordState::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A web page in the summary queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebpageRecord {
    /// Insertion-ordered identifier assigned by the store.
    pub id: i64,
    /// The page URL; unique within a queue.
    pub url: String,
    /// Page title, empty until extraction succeeds (and possibly after).
    pub title: String,
    /// Extractive summary, empty while pending.
    pub summary: String,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
}

impl WebpageRecord {
    pub fn is_ready(&self) -> bool {
        self.state == RecordState::Ready
    }
}

/// Title and summary computed for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub summary: String,
}

/// A summarization ratio strictly between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(value: f64) -> Result<Self, SummaryError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Ratio(value))
        } else {
            Err(SummaryError::InvalidParameter(value))
        }
    }

    /// Validate `value`, falling back to [`DEFAULT_RATIO`] with a warning when
    /// it is missing or out of range.
    pub fn or_default(value: Option<f64>) -> Self {
        match value {
            None => Ratio(DEFAULT_RATIO),
            Some(v) => Ratio::new(v).unwrap_or_else(|_| {
                warn!(
                    ratio = v,
                    fallback = DEFAULT_RATIO,
                    "Summarization ratio out of range; using default"
                );
                Ratio(DEFAULT_RATIO)
            }),
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Ratio(DEFAULT_RATIO)
    }
}

/// Parse `raw` as an absolute http or https URL.
pub fn validate_url(raw: &str) -> Result<Url, SummaryError> {
    let invalid = |reason: &str| SummaryError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme {other:?}"))),
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_rejects_out_of_range() {
        for bad in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(
                matches!(Ratio::new(bad), Err(SummaryError::InvalidParameter(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_ratio_accepts_open_interval() {
        assert_eq!(Ratio::new(0.01).unwrap().get(), 0.01);
        assert_eq!(Ratio::new(0.99).unwrap().get(), 0.99);
    }

    #[test]
    fn test_ratio_or_default() {
        assert_eq!(Ratio::or_default(None).get(), DEFAULT_RATIO);
        assert_eq!(Ratio::or_default(Some(3.0)).get(), DEFAULT_RATIO);
        assert_eq!(Ratio::or_default(Some(0.5)).get(), 0.5);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(SummaryError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(SummaryError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("/relative/path"),
            Err(SummaryError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_record_state_roundtrip_str() {
        assert_eq!(RecordState::parse("ready"), Some(RecordState::Ready));
        assert_eq!(RecordState::parse(RecordState::Pending.as_str()), Some(RecordState::Pending));
        assert_eq!(RecordState::parse("deleted"), None);
    }
}
