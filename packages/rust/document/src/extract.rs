//! PDF to text extraction.
//!
//! The PDF's text is written to an intermediate plain-text file first, then
//! split into paragraphs on blank lines.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use askweb_shared::{AskWebError, ExtractedText, Result};

/// One or more blank (or whitespace-only) lines between paragraphs.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r\f\v]*\n").expect("paragraph break regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Turns a PDF into paragraphs.
pub trait TextExtractor {
    /// Extract `pdf`, leaving the plain text at `intermediate`.
    fn extract(&self, pdf: &Path, intermediate: &Path) -> Result<ExtractedText>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    #[instrument(skip_all, fields(pdf = %pdf.display()))]
    fn extract(&self, pdf: &Path, intermediate: &Path) -> Result<ExtractedText> {
        let bytes = std::fs::read(pdf).map_err(|e| AskWebError::io(pdf, e))?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| AskWebError::Document(format!("{}: {e}", pdf.display())))?;

        std::fs::write(intermediate, &text).map_err(|e| AskWebError::io(intermediate, e))?;

        let paragraphs = split_paragraphs(&text);
        debug!(
            chars = text.chars().count(),
            paragraphs = paragraphs.len(),
            "extracted PDF text"
        );
        Ok(ExtractedText::from_paragraphs(paragraphs))
    }
}

/// Split plain text into paragraphs.
///
/// Blocks are separated by blank lines; line breaks inside a block collapse to
/// single spaces and whitespace-only blocks are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");

    PARAGRAPH_BREAK
        .split(&normalized)
        .map(|block| WHITESPACE_RUN.replace_all(block.trim(), " ").into_owned())
        .filter(|p| !p.is_empty())
        .collect()
}
