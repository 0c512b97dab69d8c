//! Model client abstraction.
//!
//! A generation request is always the same shape: a system prompt, a short
//! user instruction (already augmented with the JSON schema of the expected
//! artifact) and the PDF itself. Clients turn that into text, either in one
//! piece (`ask_raw`) or as incremental deltas (`stream_raw`).

use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::AIError;
use crate::upload::PdfDocument;

/// Raw bytes from a provider's HTTP response.
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AIError>> + Send>>;

/// Incremental text produced by a model.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AIError>> + Send>>;

/// Everything a model needs to produce one artifact.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub instruction: String,
    pub document: PdfDocument,
}

impl Prompt {
    pub fn new(system: impl Into<String>, instruction: impl Into<String>, document: PdfDocument) -> Self {
        Self { system: system.into(), instruction: instruction.into(), document }
    }

    /// Approximate size for logging.
    pub fn len(&self) -> usize {
        self.system.len() + self.instruction.len() + self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable form for transcripts; the PDF is referenced, not inlined.
    pub fn summary(&self) -> String {
        format!(
            "## System\n\n{}\n\n## Instruction\n\n{}\n\n## Document\n\n{} ({} bytes)",
            self.system,
            self.instruction,
            self.document.name,
            self.document.len()
        )
    }
}

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the raw
/// model text. Providers that support real streaming override `stream_raw`;
/// the default delivers the whole answer as a single delta.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;

    async fn stream_raw(&self, prompt: Prompt) -> Result<TextStream, AIError> {
        let text = self.ask_raw(prompt).await?;
        Ok(Box::pin(futures_util::stream::once(async move { Ok(text) })))
    }
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }

    async fn stream_raw(&self, prompt: Prompt) -> Result<TextStream, AIError> {
        self.as_ref().stream_raw(prompt).await
    }
}
