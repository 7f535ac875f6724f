//! Passage relevance scoring.
//!
//! Both passages are normalized (lowercased, non-alphanumeric tokens and
//! stopwords dropped), then compared by cosine similarity of their TF-IDF
//! vectors. The IDF comes from the two passages alone, so scores are only
//! meaningful against the same reference.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use askweb_shared::ScoredPassage;

use crate::stopwords::Stopwords;

/// Word runs and punctuation runs, in order.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").expect("token regex"));

/// Vocabulary terms: two or more word characters.
static TERM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("term regex"));

/// Number of documents in every comparison.
const CORPUS_SIZE: f64 = 2.0;

/// Raw term counts of one preprocessed passage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermCounts(BTreeMap<String, f64>);

impl TermCounts {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Scores passages against a reference with a fixed stopword set.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer<'a> {
    stopwords: &'a Stopwords,
}

impl<'a> RelevanceScorer<'a> {
    pub fn new(stopwords: &'a Stopwords) -> Self {
        Self { stopwords }
    }

    /// Lowercase, keep alphanumeric non-stopword tokens, rejoin with spaces.
    pub fn preprocess(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        TOKEN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.chars().all(char::is_alphanumeric))
            .filter(|t| !self.stopwords.contains(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Preprocess `text` and count its vocabulary terms.
    pub fn term_counts(&self, text: &str) -> TermCounts {
        let cleaned = self.preprocess(text);
        let mut counts = BTreeMap::new();
        for term in TERM.find_iter(&cleaned) {
            *counts.entry(term.as_str().to_string()).or_insert(0.0) += 1.0;
        }
        TermCounts(counts)
    }

    /// Cosine similarity of the two passages in `[0, 1]`.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        cosine(&self.term_counts(a), &self.term_counts(b))
    }

    /// `score(passage, reference) >= threshold`.
    pub fn is_relevant(&self, passage: &str, reference: &str, threshold: f64) -> bool {
        self.score(passage, reference) >= threshold
    }

    /// Score every passage against one reference, preserving order.
    pub fn score_passages<I, S>(&self, passages: I, reference: &str, threshold: f64) -> Vec<ScoredPassage>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reference = self.term_counts(reference);
        passages
            .into_iter()
            .map(|p| {
                let text = p.into();
                let score = cosine(&self.term_counts(&text), &reference);
                ScoredPassage {
                    text,
                    score,
                    accepted: score >= threshold,
                }
            })
            .collect()
    }
}

/// TF-IDF cosine over a two-document corpus.
///
/// IDF is smoothed, `ln((1 + n) / (1 + df)) + 1`, and rows are L2-normalized.
/// An empty side scores `0.0`.
pub fn cosine<'a>(a: &'a TermCounts, b: &'a TermCounts) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let idf = |term: &str| {
        let df = f64::from(u8::from(a.0.contains_key(term)) + u8::from(b.0.contains_key(term)));
        ((1.0 + CORPUS_SIZE) / (1.0 + df)).ln() + 1.0
    };

    let weights = |counts: &'a TermCounts| -> BTreeMap<&'a str, f64> {
        counts
            .0
            .iter()
            .map(|(term, tf)| (term.as_str(), tf * idf(term)))
            .collect()
    };
    let wa = weights(a);
    let wb = weights(b);

    let norm = |w: &BTreeMap<&str, f64>| w.values().map(|v| v * v).sum::<f64>().sqrt();
    let (na, nb) = (norm(&wa), norm(&wb));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }

    let dot: f64 = wa
        .iter()
        .filter_map(|(term, va)| wb.get(term).map(|vb| va * vb))
        .sum();

    (dot / (na * nb)).clamp(0.0, 1.0)
}
