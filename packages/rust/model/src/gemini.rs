//! Gemini Pro content-generation backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use askweb_shared::{AskWebError, ModelConfig, Result};

use crate::AnswerModel;
use crate::http::{build_client, send_json};
use crate::palm::ModelInfo;
use crate::prompt::build_prompt;

const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ContentCandidate>,
}

#[derive(Debug, Deserialize)]
struct ContentCandidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini client for a single named model.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    api_key: Option<String>,
}

impl GeminiModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .gemini_model
            .trim()
            .trim_start_matches("models/")
            .to_string();
        if model.is_empty() {
            return Err(AskWebError::config("model.gemini_model must not be empty"));
        }

        Ok(Self {
            client: build_client()?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            api_key: None,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

impl AnswerModel for GeminiModel {
    #[instrument(skip_all, fields(backend = "gemini-pro", model = %self.model))]
    async fn initialize(&mut self, api_key: &str) -> Result<()> {
        let endpoint = format!("{}/models/{}", self.base_url, self.model);
        let request = self.client.get(&endpoint).query(&[("key", api_key)]);
        let info: ModelInfo = send_json(request, &endpoint).await?;

        if !info.supports(GENERATE_CONTENT) {
            return Err(AskWebError::Model(format!(
                "{} does not support {GENERATE_CONTENT}",
                info.name
            )));
        }

        info!(model = %info.name, "Gemini model ready");
        self.api_key = Some(api_key.to_string());
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "gemini-pro", context_chars = context.chars().count()))]
    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AskWebError::uninitialized("gemini-pro"))?;

        let prompt = build_prompt(question, context);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let endpoint = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self
            .client
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&body);
        let response: GenerateContentResponse = send_json(request, &endpoint).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| AskWebError::Model("Gemini returned no candidates".into()))?;

        debug!(answer_chars = text.chars().count(), "Gemini answered");
        Ok(text)
    }
}
