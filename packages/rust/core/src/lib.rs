//! Core context assembly for askweb.
//!
//! This crate turns search results into a model answer: relevance scoring,
//! paragraph windowing, context budgeting, per-query workspaces, and the
//! end-to-end `ask` pipeline that drives them.

pub mod budget;
pub mod pipeline;
pub mod relevance;
pub mod stopwords;
pub mod window;
pub mod workspace;

pub use budget::{MAX_CONTEXT_CHARS, budget};
pub use pipeline::{
    Answer, AnswerMode, ContextPipeline, PipelineSettings, ProgressReporter, SilentProgress,
};
pub use relevance::{RelevanceScorer, TermCounts, cosine};
pub use stopwords::Stopwords;
pub use window::ChunkWindow;
pub use workspace::{Workspace, sanitize_domain};
