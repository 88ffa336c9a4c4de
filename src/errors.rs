//! Error taxonomy for summarizing, queueing, and delivering web pages.
//!
//! Every recoverable failure in the crate is a [`SummaryError`]. Callers decide
//! whether a variant is surfaced (one-shot submission), logged and skipped
//! (batch processing), or retried later (deletion).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Invalid web page URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid summarization ratio {0}: must be between 0 and 1, exclusive")]
    InvalidParameter(f64),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No paragraph text found on {0}")]
    NoContent(String),

    #[error("Failed to delete {url} from the queue: {reason}")]
    Deletion { url: String, reason: String },

    #[error("Queue storage unavailable: {0}")]
    Storage(String),

    #[error("Speech output failed: {0}")]
    Speech(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SummaryError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        SummaryError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn deletion(url: &str, reason: impl ToString) -> Self {
        SummaryError::Deletion {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for SummaryError {
    fn from(error: rusqlite::Error) -> Self {
        SummaryError::Storage(error.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SummaryError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        SummaryError::Storage(format!("connection lock poisoned: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let e = SummaryError::InvalidParameter(1.5);
        assert_eq!(
            e.to_string(),
            "Invalid summarization ratio 1.5: must be between 0 and 1, exclusive"
        );
    }

    #[test]
    fn test_fetch_helper() {
        let e = SummaryError::fetch("https://example.com", "HTTP status 404 Not Found");
        assert!(matches!(e, SummaryError::Fetch { .. }));
        assert!(e.to_string().contains("https://example.com"));
        assert!(e.to_string().contains("404"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_storage() {
        let e: SummaryError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(e, SummaryError::Storage(_)));
    }
}
