//! PDF documents: merging rendered pages and extracting their text.

mod extract;
mod merge;

pub use extract::{PdfTextExtractor, TextExtractor, split_paragraphs};
pub use merge::merge_pdfs;
