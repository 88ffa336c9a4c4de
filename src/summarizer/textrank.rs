//! Extractive summarization by sentence ranking.
//!
//! Sentences form a graph whose edges are weighted by word overlap; a weighted
//! PageRank over that graph scores each sentence, and the best-scoring ones are
//! returned in their original order.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const CONVERGENCE: f64 = 1e-6;
/// Sentences considered for ranking; later ones are ignored. The similarity
/// matrix and every PageRank pass are quadratic in this number.
pub const MAX_SENTENCES: usize = 300;

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}]+)?").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
        "at", "be", "because", "been", "before", "being", "between", "both", "but", "by", "can",
        "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
        "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
        "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most",
        "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our",
        "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than",
        "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this",
        "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
        "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
        "you", "your", "yours",
    ]
    .into_iter()
    .collect()
});

/// Split text into trimmed sentences at terminal punctuation followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        push_trimmed(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.split_whitespace().join(" ");
    if !s.is_empty() {
        out.push(s);
    }
}

fn content_words(sentence: &str) -> HashSet<String> {
    WORD.find_iter(sentence)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOP_WORDS.contains(w.as_str()))
        .collect()
}

fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let overlap = a.intersection(b).count() as f64;
    overlap / ((1.0 + a.len() as f64).ln() + (1.0 + b.len() as f64).ln())
}

/// Weighted PageRank over a symmetric similarity matrix.
fn rank(weights: &[Vec<f64>]) -> Vec<f64> {
    let n = weights.len();
    let out_weight: Vec<f64> = weights.iter().map(|row| row.iter().sum()).collect();
    let mut scores = vec![1.0; n];

    for _ in 0..MAX_ITERATIONS {
        let next: Vec<f64> = (0..n)
            .map(|i| {
                let incoming: f64 = (0..n)
                    .filter(|&j| j != i && out_weight[j] > 0.0)
                    .map(|j| weights[j][i] / out_weight[j] * scores[j])
                    .sum();
                (1.0 - DAMPING) + DAMPING * incoming
            })
            .collect();
        let delta = next
            .iter()
            .zip(&scores)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        scores = next;
        if delta < CONVERGENCE {
            break;
        }
    }
    scores
}

/// Number of sentences kept for `total` input sentences at `ratio`.
pub fn sentence_budget(total: usize, ratio: f64) -> usize {
    let kept = (total as f64 * ratio + 1e-9).floor() as usize;
    kept.clamp(1, total.max(1))
}

/// Summarize `text`, keeping roughly `ratio` of its sentences.
///
/// Returns an empty string when `text` has no sentences. The result is a
/// space-joined subset of the input sentences in source order, drawn from the
/// first [`MAX_SENTENCES`] of them.
pub fn summarize(text: &str, ratio: f64) -> String {
    let mut sentences = split_sentences(text);
    sentences.truncate(MAX_SENTENCES);
    if sentences.len() <= 1 {
        return sentences.into_iter().next().unwrap_or_default();
    }

    let words: Vec<HashSet<String>> = sentences.iter().map(|s| content_words(s)).collect();
    let n = sentences.len();
    let mut weights = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = similarity(&words[i], &words[j]);
            weights[i][j] = w;
            weights[j][i] = w;
        }
    }
    let scores = rank(&weights);

    let budget = sentence_budget(n, ratio);
    (0..n)
        .sorted_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)))
        .take(budget)
        .sorted()
        .map(|i| sentences[i].as_str())
        .join(" ")
        .trim()
        .to_string()
}
