//! Small helpers for logging and filesystem setup.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::errors::SummaryError;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary) with
/// an ellipsis and the number of dropped bytes appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates missing directories, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %file.display()))]
pub async fn ensure_parent_writable(file: &Path) -> Result<(), SummaryError> {
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let unwritable =
        |e: std::io::Error| SummaryError::Storage(format!("{} is not writable: {e}", dir.display()));

    fs::create_dir_all(&dir).await.map_err(unwritable)?;
    let probe = dir.join("..__probe_write__");
    fs::write(&probe, b"").await.map_err(unwritable)?;
    let _ = fs::remove_file(&probe).await;
    info!(dir = %dir.display(), "Storage directory is writable");
    Ok(())
}
