use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::gemini::GeminiClient;
use crate::clients::mock::{MockClient, MockHandle, MockResponse};
use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, Prompt, TextStream};
use crate::error::AIError;

/// Which model backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Gemini,
    Mock,
}

impl Default for ClientType {
    /// Gemini when an API key is available, otherwise the mock.
    fn default() -> Self {
        if GeminiClient::has_key() {
            Self::Gemini
        } else {
            Self::Mock
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    /// Parse client type from string (case insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: gemini, mock", s)),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::Gemini => write!(f, "Gemini"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Flexible client that wraps any LowLevelClient and provides factory functions
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl FlexibleClient {
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    /// Build the client a [`ClientType`] names. `model` overrides the provider default.
    pub fn from_type(client_type: ClientType, model: Option<&str>) -> Result<Self, AIError> {
        match client_type {
            ClientType::Gemini => {
                let client = GeminiClient::from_env()?;
                let client = match model {
                    Some(model) => client.with_model(model),
                    None => client,
                };
                Ok(Self::new(Box::new(client)))
            }
            ClientType::Mock => Ok(Self::mock().0),
        }
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::new();
        (Self::new(Box::new(mock_client)), handle)
    }

    pub fn mock_with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(mock_client)), handle)
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    async fn stream_raw(&self, prompt: Prompt) -> Result<TextStream, AIError> {
        self.inner.stream_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
