//! PaLM 2 text-generation backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use askweb_shared::{AskWebError, ModelConfig, Result};

use crate::AnswerModel;
use crate::http::{build_client, send_json};
use crate::prompt::build_prompt;

/// Generation method a model must support to be picked.
const GENERATE_TEXT: &str = "generateText";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTextRequest<'a> {
    prompt: TextPrompt<'a>,
    temperature: f32,
    candidate_count: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateTextResponse {
    #[serde(default)]
    candidates: Vec<TextCandidate>,
}

#[derive(Debug, Deserialize)]
struct TextCandidate {
    #[serde(default)]
    output: String,
}

// ---------------------------------------------------------------------------
// PalmModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Session {
    api_key: String,
    model: String,
}

/// PaLM 2 client. Picks the first listed model that supports text generation.
#[derive(Debug, Clone)]
pub struct PalmModel {
    client: Client,
    base_url: String,
    temperature: f32,
    candidate_count: u32,
    max_output_tokens: u32,
    session: Option<Session>,
}

impl PalmModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: config.palm_base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            candidate_count: config.candidate_count,
            max_output_tokens: config.max_output_tokens,
            session: None,
        })
    }

    /// Name of the selected model, once initialized.
    pub fn model_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.model.as_str())
    }
}

impl AnswerModel for PalmModel {
    #[instrument(skip_all, fields(backend = "palm2"))]
    async fn initialize(&mut self, api_key: &str) -> Result<()> {
        let endpoint = format!("{}/models", self.base_url);
        let request = self.client.get(&endpoint).query(&[("key", api_key)]);
        let list: ModelList = send_json(request, &endpoint).await?;

        let model = list
            .models
            .into_iter()
            .find(|m| m.supports(GENERATE_TEXT))
            .ok_or_else(|| AskWebError::Model("no models with text generation support found".into()))?;

        info!(model = %model.name, "PaLM 2 model selected");
        self.session = Some(Session {
            api_key: api_key.to_string(),
            model: model.name,
        });
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "palm2", context_chars = context.chars().count()))]
    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AskWebError::uninitialized("palm2"))?;

        let prompt = build_prompt(question, context);
        let body = GenerateTextRequest {
            prompt: TextPrompt { text: &prompt },
            temperature: self.temperature,
            candidate_count: self.candidate_count,
            max_output_tokens: self.max_output_tokens,
        };

        let endpoint = format!("{}/{}:generateText", self.base_url, session.model);
        let request = self
            .client
            .post(&endpoint)
            .query(&[("key", session.api_key.as_str())])
            .json(&body);
        let response: GenerateTextResponse = send_json(request, &endpoint).await?;

        let first = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AskWebError::Model("PaLM 2 returned no candidates".into()))?;

        debug!(answer_chars = first.output.chars().count(), "PaLM 2 answered");
        Ok(first.output)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn model_for(server: &MockServer) -> PalmModel {
        let config = ModelConfig {
            palm_base_url: format!("{}/v1beta3", server.uri()),
            ..ModelConfig::default()
        };
        PalmModel::new(&config).unwrap()
    }

    async fn mount_model_list(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1beta3/models"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    {"name": "models/chat-bison-001", "supportedGenerationMethods": ["generateMessage"]},
                    {"name": "models/text-bison-001", "supportedGenerationMethods": ["generateText", "countTextTokens"]},
                    {"name": "models/text-bison-002", "supportedGenerationMethods": ["generateText"]}
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn picks_first_text_model_and_answers() {
        let server = MockServer::start().await;
        mount_model_list(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1beta3/models/text-bison-001:generateText"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "candidateCount": 3,
                "maxOutputTokens": 100
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    {"output": "Plants turn light into sugar."},
                    {"output": "second"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut model = model_for(&server);
        model.initialize("test-key").await.unwrap();
        assert_eq!(model.model_name(), Some("models/text-bison-001"));

        let answer = model
            .answer("Photosynthesis makes sugar.", "How does photosynthesis work?")
            .await
            .unwrap();
        assert_eq!(answer, "Plants turn light into sugar.");
    }

    #[tokio::test]
    async fn answer_before_initialize_fails() {
        let server = MockServer::start().await;
        let model = model_for(&server);

        let err = model.answer("ctx", "q").await.unwrap_err();
        assert!(matches!(err, AskWebError::Uninitialized { .. }));
    }

    #[tokio::test]
    async fn no_text_models_is_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta3/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "models/embedding-gecko-001", "supportedGenerationMethods": ["embedText"]}]
            })))
            .mount(&server)
            .await;

        let mut model = model_for(&server);
        let err = model.initialize("test-key").await.unwrap_err();
        assert!(matches!(err, AskWebError::Model(_)));
        assert!(model.model_name().is_none());
    }

    #[tokio::test]
    async fn empty_candidates_is_model_error() {
        let server = MockServer::start().await;
        mount_model_list(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let mut model = model_for(&server);
        model.initialize("test-key").await.unwrap();
        let err = model.answer("ctx", "q").await.unwrap_err();
        assert!(matches!(err, AskWebError::Model(_)));
    }

    #[tokio::test]
    async fn rejected_key_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let mut model = model_for(&server);
        let err = model.initialize("bad-key").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(!msg.contains("bad-key"));
    }
}
