use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, Prompt, TextStream};
use crate::error::{AIError, GeminiError};
use crate::streaming::sse_text_deltas;
use crate::upload::PDF_MIME_TYPE;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---- wire types ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();
        Some(text)
    }
}

impl GenerateContentRequest {
    pub fn new(prompt: &Prompt, config: &GeminiConfig) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text { text: prompt.system.clone() }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::Text { text: prompt.instruction.clone() },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: PDF_MIME_TYPE.to_string(),
                            data: prompt.document.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }
}

// ---- client ----

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: GeminiClient::find_key().unwrap_or_default(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            temperature: 0.4,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl KeyFromEnv for GeminiClient {
    const KEY_NAME: &'static str = "GOOGLE_GENERATIVE_AI_API_KEY";
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model, "Creating new Gemini client");
        Self { config, client: Client::new() }
    }

    /// Build a client from the environment, failing if no API key is configured.
    pub fn from_env() -> Result<Self, AIError> {
        let config = GeminiConfig::default();
        if config.api_key.is_empty() {
            error!(variable = Self::KEY_NAME, "Gemini API key not found");
            return Err(GeminiError::Authentication.into());
        }
        Ok(Self::new(config))
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        info!(model = %self.config.model, "Setting Gemini model");
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url.trim_end_matches('/'), self.config.model, method)
    }

    async fn send(&self, url: String, prompt: &Prompt) -> Result<Response, AIError> {
        let request = GenerateContentRequest::new(prompt, &self.config);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GeminiError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from Gemini API");
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, AIError> {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Gemini API rate limit exceeded");
            Err(GeminiError::RateLimit.into())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("Gemini API authentication failed");
            Err(GeminiError::Authentication.into())
        }
        status if !status.is_success() => {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API error");
            Err(GeminiError::Api(error_text).into())
        }
        _ => Ok(response),
    }
}

#[async_trait]
impl LowLevelClient for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model))]
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        let response = self.send(self.endpoint("generateContent"), &prompt).await?;

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response JSON");
            GeminiError::Http(e.to_string())
        })?;

        let result = parsed.text().ok_or_else(|| {
            error!("No candidates in Gemini response");
            AIError::from(GeminiError::Api("No candidates in response".to_string()))
        });

        if let Ok(text) = &result {
            info!(response_len = text.len(), "Successfully received Gemini response");
        }
        result
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model))]
    async fn stream_raw(&self, prompt: Prompt) -> Result<TextStream, AIError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.send(url, &prompt).await?;
        info!("Gemini stream opened");

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AIError::from(GeminiError::Http(e.to_string()))));
        Ok(Box::pin(sse_text_deltas(Box::pin(bytes), |payload| {
            serde_json::from_str::<GenerateContentResponse>(payload)
                .ok()
                .and_then(|r| r.text())
        })))
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::PdfDocument;

    #[test]
    fn request_carries_pdf_as_inline_data() {
        let prompt = Prompt::new("system", "instruction", PdfDocument::new("a.pdf", b"%PDF".to_vec()));
        let config = GeminiConfig { api_key: "k".into(), ..GeminiConfig::default() };
        let json = serde_json::to_value(GenerateContentRequest::new(&prompt, &config)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "JVBERg==");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"[{\"a\""},{"text":":1}]"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("[{\"a\":1}]"));
    }

    #[test]
    fn empty_candidates_yield_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(parsed.text().is_none());
    }
}
