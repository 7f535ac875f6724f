//! Core domain types shared across askweb crates.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A search hit with its deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Target URL extracted from the provider's redirect link.
    pub url: String,
    /// Heuristic domain key; equal keys are duplicates.
    pub domain_key: String,
}

/// Accepted sources as two parallel sequences in acceptance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub urls: Vec<String>,
    pub domains: Vec<String>,
}

impl Selection {
    /// Number of accepted sources.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Record an accepted result.
    pub fn push(&mut self, result: SearchResult) {
        self.urls.push(result.url);
        self.domains.push(result.domain_key);
    }

    /// Iterate accepted results in acceptance order.
    pub fn iter(&self) -> impl Iterator<Item = SearchResult> + '_ {
        self.urls
            .iter()
            .zip(self.domains.iter())
            .map(|(url, domain)| SearchResult {
                url: url.clone(),
                domain_key: domain.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Passages
// ---------------------------------------------------------------------------

/// A passage scored against a reference document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPassage {
    pub text: String,
    /// Cosine similarity in `[0, 1]`.
    pub score: f64,
    /// `score >= threshold`.
    pub accepted: bool,
}

/// Text pulled out of a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    /// Paragraphs joined with `\n`.
    pub full_text: String,
    /// Non-empty paragraphs in reading order.
    pub paragraphs: Vec<String>,
}

impl ExtractedText {
    /// Build from paragraphs, dropping whitespace-only entries.
    pub fn from_paragraphs(paragraphs: Vec<String>) -> Self {
        let paragraphs: Vec<String> = paragraphs
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        Self {
            full_text: paragraphs.join("\n"),
            paragraphs,
        }
    }
}
