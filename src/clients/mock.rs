use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::core::{LowLevelClient, Prompt, TextStream};
use crate::error::AIError;

/// A canned answer for [`MockClient`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// The whole answer at once (a single delta when streamed).
    Success(String),
    /// The answer split into deltas, as a streaming provider would send it.
    Chunks(Vec<String>),
    /// The call fails with `AIError::Mock`.
    Error(String),
}

/// Shared control surface for a [`MockClient`]: queue responses, inspect calls.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockHandle {
    pub fn add_response(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        lock(&self.responses).extend(responses);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.prompts).clone()
    }

    fn next(&self, prompt: Prompt) -> MockResponse {
        lock(&self.prompts).push(prompt);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Error("no mock response queued".to_string()))
    }
}

// A poisoned lock only means another test thread panicked; keep going with the data.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock client for tests and offline runs. Answers come from its [`MockHandle`].
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        handle.add_responses(responses);
        (client, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        match self.handle.next(prompt) {
            MockResponse::Success(text) => Ok(text),
            MockResponse::Chunks(chunks) => Ok(chunks.concat()),
            MockResponse::Error(message) => Err(AIError::Mock(message)),
        }
    }

    async fn stream_raw(&self, prompt: Prompt) -> Result<TextStream, AIError> {
        let chunks = match self.handle.next(prompt) {
            MockResponse::Success(text) => vec![text],
            MockResponse::Chunks(chunks) => chunks,
            MockResponse::Error(message) => return Err(AIError::Mock(message)),
        };
        debug!(chunks = chunks.len(), "streaming mock response");
        Ok(Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok))))
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
