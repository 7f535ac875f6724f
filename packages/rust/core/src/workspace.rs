//! Per-query scratch directory.
//!
//! Every query gets its own directory under the scratch root, so concurrent
//! queries never touch each other's files.

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use askweb_shared::{AskWebError, Result};

const PDF_DIR: &str = "pdf";
const MERGED_PDF: &str = "merged.pdf";
const MERGED_TEXT: &str = "merged.txt";
const REFERENCE_TEXT: &str = "reference.txt";

/// Scratch directory for one query. Removed on drop unless `keep` is set.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create a fresh workspace named by a new UUID v7 under `scratch_root`.
    pub fn create(scratch_root: &Path, keep: bool) -> Result<Self> {
        Self::at(scratch_root.join(Uuid::now_v7().to_string()), keep)
    }

    /// Reset `root`: remove whatever is there, then recreate it with a `pdf/` subdirectory.
    pub fn at(root: PathBuf, keep: bool) -> Result<Self> {
        match std::fs::remove_dir_all(&root) {
            Ok(()) => debug!(path = %root.display(), "removed stale workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AskWebError::io(&root, e)),
        }

        let pdf_dir = root.join(PDF_DIR);
        std::fs::create_dir_all(&pdf_dir).map_err(|e| AskWebError::io(&pdf_dir, e))?;

        debug!(path = %root.display(), "workspace ready");
        Ok(Self { root, keep })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join(PDF_DIR)
    }

    /// Path for the rendered PDF of the `index`-th accepted source.
    pub fn source_pdf(&self, index: usize, domain: &str) -> PathBuf {
        self.pdf_dir()
            .join(format!("{index:02}-{}.pdf", sanitize_domain(domain)))
    }

    pub fn merged_pdf(&self) -> PathBuf {
        self.root.join(MERGED_PDF)
    }

    pub fn merged_text(&self) -> PathBuf {
        self.root.join(MERGED_TEXT)
    }

    pub fn reference_text(&self) -> PathBuf {
        self.root.join(REFERENCE_TEXT)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            debug!(path = %self.root.display(), "keeping workspace");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            debug!(path = %self.root.display(), error = %e, "workspace cleanup failed");
        }
    }
}

/// Restrict a domain key to `[A-Za-z0-9._-]`; anything else becomes `_`.
pub fn sanitize_domain(domain: &str) -> String {
    let cleaned: String = domain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "source".to_string(),
        s => s.to_string(),
    }
}
