//! Overlapping paragraph windows.

use askweb_shared::{AskWebError, Result};

/// Fixed-size paragraph windows with overlap between neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    size: usize,
    overlap: usize,
}

impl Default for ChunkWindow {
    fn default() -> Self {
        Self {
            size: 10,
            overlap: 2,
        }
    }
}

impl ChunkWindow {
    /// Requires `overlap < size`, which also rules out `size == 0`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if overlap >= size {
            return Err(AskWebError::validation(format!(
                "chunk overlap {overlap} must be smaller than chunk size {size}"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Join consecutive windows of paragraphs with single spaces.
    ///
    /// Full windows advance by `size - overlap`; whatever remains after the
    /// last full window becomes one trailing chunk, which is empty when
    /// nothing remains. The result is never empty.
    pub fn window<S: AsRef<str>>(&self, paragraphs: &[S]) -> Vec<String> {
        let step = self.size - self.overlap;
        let mut chunks = Vec::with_capacity(paragraphs.len() / step + 1);
        let mut start = 0;

        while start + self.size <= paragraphs.len() {
            chunks.push(join(&paragraphs[start..start + self.size]));
            start += step;
        }
        chunks.push(join(&paragraphs[start..]));

        chunks
    }
}

fn join<S: AsRef<str>>(paragraphs: &[S]) -> String {
    paragraphs
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}
