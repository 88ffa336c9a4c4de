//! Recognising spoken commands.
//!
//! Utterances are matched case-insensitively:
//!
//! | Utterance | Intent |
//! |-----------|--------|
//! | "read web page summaries", "read the webpage summary", "read summaries" | [`Intent::ReadSummaries`] |
//! | "stop", "cancel", "no", "that's enough" | [`Intent::Stop`] |
//! | "yes", "continue", "next", "go on" | [`Intent::Continue`] |

use once_cell::sync::Lazy;
use regex::Regex;

static READ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?read\s+(?:me\s+)?(?:the\s+|my\s+)?(?:web\s*page\s+)?summar(?:y|ies)\b")
        .unwrap()
});
static STOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:stop|cancel|no|nope|quit|exit|that'?s\s+enough|enough)\b").unwrap()
});
static CONTINUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:y|yes|yeah|sure|ok(?:ay)?|continue|next|go\s+on)?\s*[.!]?\s*$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ReadSummaries,
    Stop,
    Continue,
    Unknown,
}

pub fn parse(utterance: &str) -> Intent {
    if READ.is_match(utterance) {
        Intent::ReadSummaries
    } else if STOP.is_match(utterance) {
        Intent::Stop
    } else if CONTINUE.is_match(utterance) {
        Intent::Continue
    } else {
        Intent::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_phrases() {
        for phrase in [
            "read web page summaries",
            "Read web page summary",
            "read the webpage summaries",
            "read summaries",
            "read summary",
            "please read my summaries",
        ] {
            assert_eq!(parse(phrase), Intent::ReadSummaries, "{phrase}");
        }
    }

    #[test]
    fn test_stop_phrases() {
        for phrase in ["stop", "Stop.", "cancel", "no", "that's enough", "thats enough"] {
            assert_eq!(parse(phrase), Intent::Stop, "{phrase}");
        }
    }

    #[test]
    fn test_continue_phrases() {
        for phrase in ["", "yes", "Y", "next", "go on", "okay!"] {
            assert_eq!(parse(phrase), Intent::Continue, "{phrase:?}");
        }
    }

    #[test]
    fn test_unrelated_phrases() {
        assert_eq!(parse("what's the weather"), Intent::Unknown);
        assert_eq!(parse("read a book"), Intent::Unknown);
        assert_eq!(parse("nobody"), Intent::Unknown);
    }
}
