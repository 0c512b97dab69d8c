//! Artifact generation: prompt assembly, the model call, and validation.
//!
//! - `ArtifactGenerator::generate::<T>()` waits for the full answer.
//! - `ArtifactGenerator::stream::<T>()` reports elements as they arrive and
//!   finishes with the validated artifact.
//!
//! There are no retries. Any model or validation failure ends the attempt.

use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use schemars::{schema_for, JsonSchema};
use tracing::{debug, info, instrument, warn};

use crate::core::{LowLevelClient, Prompt};
use crate::error::GenerationError;
use crate::interceptors::Interceptor;
use crate::schema::{
    Artifact, ArtifactKind, FlashCard, GeneratedArtifact, MatchingSet, Question, DEFAULT_MATCHING_PAIRS,
    MAX_MATCHING_PAIRS, MIN_MATCHING_PAIRS,
};
use crate::streaming::{artifact_events, finish, with_deadline, GenerationEvent};
use crate::upload::PdfDocument;

/// Type alias for a streamed generation.
pub type GenerationStream<T> = Pin<Box<dyn Stream<Item = Result<GenerationEvent<T>, GenerationError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Pairs requested for (and required in) a matching set. Always within 4..=20.
    pub matching_pairs: usize,
    /// Execution ceiling for one generation, from request to last byte.
    pub max_duration: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            matching_pairs: DEFAULT_MATCHING_PAIRS,
            max_duration: Duration::from_secs(60),
        }
    }
}

impl GeneratorConfig {
    /// Set the matching pair count, clamped to the range a matching set allows.
    #[must_use]
    pub fn with_matching_pairs(mut self, pairs: usize) -> Self {
        let clamped = pairs.clamp(MIN_MATCHING_PAIRS, MAX_MATCHING_PAIRS);
        if clamped != pairs {
            warn!(requested = pairs, used = clamped, "matching pair count out of range");
        }
        self.matching_pairs = clamped;
        self
    }

    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

/// Generates study artifacts from PDFs through a [`LowLevelClient`].
#[derive(Clone)]
pub struct ArtifactGenerator<C: LowLevelClient> {
    client: C,
    config: GeneratorConfig,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: LowLevelClient> Debug for ArtifactGenerator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactGenerator")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("interceptor", &self.interceptor.is_some())
            .finish()
    }
}

impl<C: LowLevelClient> ArtifactGenerator<C> {
    pub fn new(client: C, config: GeneratorConfig) -> Self {
        info!(matching_pairs = config.matching_pairs, max_duration_secs = config.max_duration.as_secs(), "Creating new ArtifactGenerator");
        Self { client, config, interceptor: None }
    }

    /// Record every prompt/response pair with `interceptor`.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The full prompt for artifact `T`.
    pub fn prompt_for<T: Artifact>(&self, document: PdfDocument) -> Prompt {
        let instruction = self.add_schema_guidance::<T>(T::instruction());
        Prompt::new(T::system_prompt(&self.config), instruction, document)
    }

    /// Add JSON schema guidance to an instruction
    fn add_schema_guidance<T>(&self, instruction: &str) -> String
    where
        T: Artifact + JsonSchema,
    {
        let schema = schema_for!(T);
        let schema_json = serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|_| "Schema serialization failed".to_string());

        format!(
            "{}\n\n## Response Format\nRespond with a JSON array of exactly {} items. Each item must match this schema:\n```json\n{}\n```",
            instruction,
            T::expected_count(&self.config),
            schema_json
        )
    }

    /// Generate and validate artifact `T`, waiting for the complete answer.
    #[instrument(target = "studygen::generator", skip(self, document), fields(kind = %T::KIND, document_len = document.len()))]
    pub async fn generate<T: Artifact>(&self, document: PdfDocument) -> Result<Vec<T>, GenerationError> {
        info!("Starting generation");
        let prompt = self.prompt_for::<T>(document);
        let transcript = self.interceptor.as_ref().map(|_| prompt.summary());

        let raw = tokio::time::timeout(self.config.max_duration, self.client.ask_raw(prompt))
            .await
            .map_err(|_| {
                warn!(limit_secs = self.config.max_duration.as_secs(), "generation exceeded execution ceiling");
                GenerationError::TimedOut(self.config.max_duration)
            })??;
        debug!(response_len = raw.len(), "Received model response");

        if let (Some(interceptor), Some(prompt)) = (&self.interceptor, transcript) {
            if let Err(e) = interceptor.save(&prompt, &raw).await {
                warn!(error = %e, "failed to write transcript");
            }
        }

        let items = finish::<T>(&raw, &self.config)?;
        info!(count = items.len(), "Generation completed");
        Ok(items)
    }

    /// Generate whichever artifact `kind` names.
    pub async fn generate_artifact(
        &self,
        kind: ArtifactKind,
        document: PdfDocument,
    ) -> Result<GeneratedArtifact, GenerationError> {
        match kind {
            ArtifactKind::Quiz => self.generate::<Question>(document).await.map(GeneratedArtifact::Quiz),
            ArtifactKind::Flashcards => self.generate::<FlashCard>(document).await.map(GeneratedArtifact::Flashcards),
            ArtifactKind::Matching => {
                let sets = self.generate::<MatchingSet>(document).await?;
                MatchingSet::into_generated(sets).ok_or_else(|| GenerationError::NoArtifactFound(String::new()))
            }
        }
    }

    /// Stream artifact `T`: `Element` events while the model writes, then `Complete`.
    ///
    /// Opening the stream and reading it share one execution ceiling.
    #[instrument(target = "studygen::generator", skip(self, document), fields(kind = %T::KIND, document_len = document.len()))]
    pub async fn stream<T: Artifact>(&self, document: PdfDocument) -> Result<GenerationStream<T>, GenerationError> {
        info!("Starting streaming generation");
        let started = tokio::time::Instant::now();
        let prompt = self.prompt_for::<T>(document);
        let transcript = self
            .interceptor
            .as_ref()
            .map(|interceptor| (interceptor.clone(), prompt.summary()));

        let deltas = tokio::time::timeout(self.config.max_duration, self.client.stream_raw(prompt))
            .await
            .map_err(|_| GenerationError::TimedOut(self.config.max_duration))??;

        let remaining = self.config.max_duration.saturating_sub(started.elapsed());
        info!("Successfully initiated streaming response");
        Ok(Box::pin(artifact_events::<T, _>(
            with_deadline(deltas, remaining),
            self.config.clone(),
            transcript,
        )))
    }
}
