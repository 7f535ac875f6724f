//! Application configuration for askweb.
//!
//! User config lives at `~/.askweb/askweb.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AskWebError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "askweb.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".askweb";

// ---------------------------------------------------------------------------
// Config structs (matching askweb.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Page-to-PDF renderer settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Context assembly settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Generative model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of distinct-domain sources to retrieve per question.
    #[serde(default = "default_urls_count")]
    pub urls_count: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            urls_count: default_urls_count(),
        }
    }
}

fn default_urls_count() -> usize {
    5
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint; receives `q` and `num` query parameters.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Raw results requested per wanted source (over-fetch for dedup).
    #[serde(default = "default_results_per_url")]
    pub results_per_url: usize,

    /// HTTP timeout for the search request.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            results_per_url: default_results_per_url(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.google.com/search".into()
}
fn default_results_per_url() -> usize {
    5
}
fn default_search_timeout() -> u64 {
    10
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Node.js binary used to drive Playwright.
    #[serde(default = "default_node_cmd")]
    pub node_cmd: String,

    /// Seconds to wait for the page to settle before printing.
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,

    /// Extra seconds on top of `timeout_secs` before the renderer is killed.
    #[serde(default = "default_hard_timeout_grace")]
    pub hard_timeout_grace_secs: u64,

    /// Print option overrides, applied key-by-key over the defaults.
    #[serde(default)]
    pub print_options: BTreeMap<String, serde_json::Value>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            node_cmd: default_node_cmd(),
            timeout_secs: default_render_timeout(),
            hard_timeout_grace_secs: default_hard_timeout_grace(),
            print_options: BTreeMap::new(),
        }
    }
}

fn default_node_cmd() -> String {
    "node".into()
}
fn default_render_timeout() -> u64 {
    2
}
fn default_hard_timeout_grace() -> u64 {
    60
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum cosine similarity (inclusive) for a web chunk to be kept.
    #[serde(default = "default_threshold")]
    pub relevance_threshold: f64,

    /// Paragraphs per window.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Paragraphs shared between neighbouring windows.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Hard cap on the context handed to the model, in characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Parent directory for per-question scratch workspaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_root: Option<PathBuf>,

    /// Keep the scratch workspace after the question is answered.
    #[serde(default)]
    pub keep_scratch: bool,

    /// Optional stopword list (one word per line) replacing the built-in English list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_threshold(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_context_chars: default_max_context_chars(),
            scratch_root: None,
            keep_scratch: false,
            stopwords_path: None,
        }
    }
}

impl PipelineConfig {
    /// Resolved scratch root (`<temp>/askweb` unless configured).
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("askweb"))
    }
}

fn default_threshold() -> f64 {
    0.2
}
fn default_chunk_size() -> usize {
    10
}
fn default_chunk_overlap() -> usize {
    2
}
fn default_max_context_chars() -> usize {
    49_000
}

/// Which generative model backend answers questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelBackend {
    /// PaLM 2 text generation (`generateText`).
    #[default]
    #[serde(rename = "palm2")]
    Palm2,
    /// Gemini Pro content generation (`generateContent`).
    #[serde(rename = "gemini-pro")]
    GeminiPro,
}

impl ModelBackend {
    /// Config/CLI spelling of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Palm2 => "palm2",
            Self::GeminiPro => "gemini-pro",
        }
    }
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelBackend {
    type Err = AskWebError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "palm2" => Ok(Self::Palm2),
            "gemini-pro" | "geminipro" => Ok(Self::GeminiPro),
            other => Err(AskWebError::config(format!(
                "invalid model backend '{other}': available backends are [palm2, gemini-pro]"
            ))),
        }
    }
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend selector.
    #[serde(default)]
    pub backend: ModelBackend,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the PaLM 2 API.
    #[serde(default = "default_palm_base_url")]
    pub palm_base_url: String,

    /// Base URL of the Gemini API.
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Gemini model name.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Candidates requested from PaLM 2 (the first one is used).
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,

    /// Output token cap per answer.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            api_key_env: default_api_key_env(),
            palm_base_url: default_palm_base_url(),
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            temperature: default_temperature(),
            candidate_count: default_candidate_count(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_palm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta3".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_gemini_model() -> String {
    "gemini-pro".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_candidate_count() -> u32 {
    3
}
fn default_max_output_tokens() -> u32 {
    100
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.askweb/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| AskWebError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.askweb/askweb.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AskWebError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AskWebError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AskWebError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AskWebError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AskWebError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(AskWebError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}
