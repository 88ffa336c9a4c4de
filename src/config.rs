//! Configuration loaded from an optional YAML file.
//!
//! Every key has a default, so an empty or missing file is valid. Values that
//! are out of range are corrected with a warning rather than rejected:
//!
//! ```yaml
//! summarization_ratio: 0.2
//! database_path: ~/.local/share/web_page_summaries/webpages.sqlite3
//! fetch_timeout_secs: 30
//! user_agent: "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:73.0) Gecko/20100101 Firefox/73.0"
//! page_size: 10
//! bind_addr: 127.0.0.1:8000
//! remote_url: http://127.0.0.1:8000
//! speech_words_per_minute: 0
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::SummaryError;
use crate::models::{Ratio, DEFAULT_RATIO};
use crate::summarizer::DEFAULT_USER_AGENT;
use crate::utils::expand_home;

const APP_DIR: &str = "web_page_summaries";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub summarization_ratio: f64,
    pub database_path: PathBuf,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Records per page of the HTTP listing.
    pub page_size: usize,
    pub bind_addr: String,
    /// When set, reading uses the queue served at this URL instead of the local database.
    pub remote_url: Option<String>,
    /// Console speech pacing; 0 prints without pausing.
    pub speech_words_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            summarization_ratio: DEFAULT_RATIO,
            database_path: default_database_path(),
            fetch_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.into(),
            page_size: 10,
            bind_addr: "127.0.0.1:8000".into(),
            remote_url: None,
            speech_words_per_minute: 0,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webpages.sqlite3")
}

impl Config {
    /// Load `path`, or the default location if it exists, or built-in defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, SummaryError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let Some(path) = path else {
            info!("No config file; using defaults");
            return Ok(Config::default().normalized());
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| SummaryError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SummaryError> {
        // An empty document deserializes as null, not as an empty mapping.
        let config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| SummaryError::Config(e.to_string()))?
        };
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.summarization_ratio = Ratio::or_default(Some(self.summarization_ratio)).get();
        if self.page_size == 0 {
            warn!("page_size must be positive; using 10");
            self.page_size = 10;
        }
        if self.fetch_timeout_secs == 0 {
            warn!("fetch_timeout_secs must be positive; using 30");
            self.fetch_timeout_secs = 30;
        }
        self.database_path = expand_home(&self.database_path);
        self
    }

    pub fn ratio(&self) -> Ratio {
        Ratio::or_default(Some(self.summarization_ratio))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.summarization_ratio, DEFAULT_RATIO);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.remote_url.is_none());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config = Config::from_yaml(
            "summarization_ratio: 0.35\npage_size: 25\nremote_url: http://queue.local:8000\n",
        )
        .unwrap();
        assert_eq!(config.ratio().get(), 0.35);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.remote_url.as_deref(), Some("http://queue.local:8000"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_out_of_range_values_are_corrected() {
        for ratio in ["0", "1", "1.5", "-0.1"] {
            let config = Config::from_yaml(&format!("summarization_ratio: {ratio}\npage_size: 0\n")).unwrap();
            assert_eq!(config.summarization_ratio, DEFAULT_RATIO, "{ratio}");
            assert_eq!(config.page_size, 10);
        }
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Config::from_yaml("summarization_ratio: [not, a, number]").unwrap_err();
        assert!(matches!(err, SummaryError::Config(_)));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, SummaryError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "database_path: /tmp/q.sqlite3\nbind_addr: 0.0.0.0:9000\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/q.sqlite3"));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }
}
