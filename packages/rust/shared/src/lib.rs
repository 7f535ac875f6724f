//! Shared types, error model, and configuration for askweb.
//!
//! This crate is the foundation depended on by all other askweb crates.
//! It provides:
//! - [`AskWebError`] for the unified error type
//! - Domain types ([`SearchResult`], [`Selection`], [`ScoredPassage`], [`ExtractedText`])
//! - Configuration ([`AppConfig`], [`ModelBackend`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ModelBackend, ModelConfig, PipelineConfig, RenderConfig,
    SearchConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{AskWebError, Result};
pub use types::{ExtractedText, ScoredPassage, SearchResult, Selection};
