//! Gemini embedding and generation clients over the REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ModelConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::GenerativeModel;
use crate::provider::ModelFactory;

const PROVIDER: &str = "Gemini";

/// Strip the optional `models/` prefix from a model identifier.
fn bare_model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

fn build_client(config: &ModelConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| RagError::llm("failed to build HTTP client", e.to_string()))
}

fn require_api_key(config: &ModelConfig) -> Result<String> {
    let key = config.api_key.trim();
    if key.is_empty() {
        return Err(RagError::configuration(
            "API key not configured",
            "set the GOOGLE_API_KEY environment variable",
        ));
    }
    Ok(key.to_string())
}

/// Shared transport for the Gemini endpoints.
#[derive(Clone)]
struct GeminiTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiTransport {
    fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: require_api_key(config)?,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, bare_model_name(model))
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::llm("request failed", e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::llm(format!("API returned {status}"), detail));
        }

        response.json::<R>().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::llm("failed to parse response", e.to_string())
        })
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'static str>, text: &'a str) -> Self {
        Self { role, parts: vec![Part { text }] }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Corpus chunks are embedded with the `RETRIEVAL_DOCUMENT` task type in
/// batches of at most `embed_batch_size`; questions use `RETRIEVAL_QUERY`.
pub struct GeminiEmbeddingProvider {
    transport: GeminiTransport,
    model: String,
    batch_size: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider from model configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if no API key is configured.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            transport: GeminiTransport::new(config)?,
            model: bare_model_name(&config.embedding_model).to_string(),
            batch_size: config.embed_batch_size.max(1),
        })
    }

    async fn embed_one(&self, text: &str, task_type: &'static str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), task_type, "embedding single text");
        let request =
            EmbedContentRequest { model: None, content: Content::text(None, text), task_type };
        let url = self.transport.endpoint(&self.model, "embedContent");
        let response: EmbedContentResponse = self.transport.post(&url, &request).await?;
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text, "RETRIEVAL_DOCUMENT").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text, "RETRIEVAL_QUERY").await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = self.transport.endpoint(&self.model, "batchEmbedContents");
        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(
                provider = PROVIDER,
                batch_size = batch.len(),
                model = %self.model,
                "embedding batch"
            );
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedContentRequest {
                        model: Some(format!("models/{}", self.model)),
                        content: Content::text(None, text),
                        task_type: "RETRIEVAL_DOCUMENT",
                    })
                    .collect(),
            };
            let response: BatchEmbedResponse = self.transport.post(&url, &request).await?;
            if response.embeddings.len() != batch.len() {
                return Err(RagError::llm(
                    "embedding count mismatch",
                    format!(
                        "sent {} texts, received {} embeddings",
                        batch.len(),
                        response.embeddings.len()
                    ),
                ));
            }
            results.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(results)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`GenerativeModel`] backed by Gemini `generateContent`.
pub struct GeminiChatModel {
    transport: GeminiTransport,
    model: String,
    temperature: f32,
}

impl GeminiChatModel {
    /// Create a chat model from model configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if no API key is configured.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            transport: GeminiTransport::new(config)?,
            model: bare_model_name(&config.llm_model).to_string(),
            temperature: config.llm_temperature,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");
        let request = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let url = self.transport.endpoint(&self.model, "generateContent");
        let response: GenerateContentResponse = self.transport.post(&url, &request).await?;

        response.into_text().ok_or_else(|| {
            error!(provider = PROVIDER, "response carried no candidates");
            RagError::llm("empty response", "no candidates returned")
        })
    }
}

/// Builds Gemini-backed model handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiModelFactory;

#[async_trait]
impl ModelFactory for GeminiModelFactory {
    async fn embeddings(&self, config: &ModelConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        info!(model = %config.embedding_model, "initializing embedding model");
        Ok(Arc::new(GeminiEmbeddingProvider::new(config)?))
    }

    async fn llm(&self, config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>> {
        info!(model = %config.llm_model, "initializing generative model");
        Ok(Arc::new(GeminiChatModel::new(config)?))
    }
}
