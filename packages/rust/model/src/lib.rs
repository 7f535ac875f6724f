//! Generative model backends.
//!
//! Every backend implements [`AnswerModel`]: `initialize` with an API key once,
//! then `answer` any number of questions. [`ModelClient`] selects a backend from
//! the `[model]` config section.

mod gemini;
mod http;
mod palm;
mod prompt;

use askweb_shared::{ModelBackend, ModelConfig, Result};

pub use gemini::GeminiModel;
pub use palm::PalmModel;
pub use prompt::build_prompt;

/// A model that answers a question from a context passage.
#[allow(async_fn_in_trait)]
pub trait AnswerModel {
    /// Authenticate and resolve the concrete model. Must succeed before [`answer`].
    ///
    /// [`answer`]: AnswerModel::answer
    async fn initialize(&mut self, api_key: &str) -> Result<()>;

    /// Answer `question` using `context`. Fails with `Uninitialized` before
    /// a successful `initialize`.
    async fn answer(&self, context: &str, question: &str) -> Result<String>;
}

/// Backend chosen at construction time.
#[derive(Debug, Clone)]
pub enum ModelClient {
    Palm2(PalmModel),
    GeminiPro(GeminiModel),
}

impl ModelClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        match config.backend {
            ModelBackend::Palm2 => Ok(Self::Palm2(PalmModel::new(config)?)),
            ModelBackend::GeminiPro => Ok(Self::GeminiPro(GeminiModel::new(config)?)),
        }
    }

    pub fn backend(&self) -> ModelBackend {
        match self {
            Self::Palm2(_) => ModelBackend::Palm2,
            Self::GeminiPro(_) => ModelBackend::GeminiPro,
        }
    }
}

impl AnswerModel for ModelClient {
    async fn initialize(&mut self, api_key: &str) -> Result<()> {
        match self {
            Self::Palm2(m) => m.initialize(api_key).await,
            Self::GeminiPro(m) => m.initialize(api_key).await,
        }
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        match self {
            Self::Palm2(m) => m.answer(context, question).await,
            Self::GeminiPro(m) => m.answer(context, question).await,
        }
    }
}
