//! Front-end application state.
//!
//! One explicit value owned by whichever front-end drives generation (the CLI
//! today) and handed to the views. Generation progress is a single tagged
//! status rather than a scan over per-mode request handles.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::core::LowLevelClient;
use crate::error::{GenerationError, UploadError};
use crate::generator::ArtifactGenerator;
use crate::schema::{Artifact, ArtifactKind, FlashCard, GeneratedArtifact, MatchingSet, Question};
use crate::streaming::GenerationEvent;
use crate::upload::{validate_selection, PdfDocument, UploadedFile};

/// Where the current generation stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Idle,
    InProgress {
        kind: ArtifactKind,
        received: usize,
        expected: usize,
    },
    Done,
    Failed {
        notice: String,
    },
}

impl GenerationStatus {
    /// Share of expected elements received so far, 0..=100.
    pub fn progress_percent(&self) -> f64 {
        match self {
            Self::InProgress { expected: 0, .. } | Self::Idle | Self::Failed { .. } => 0.0,
            Self::InProgress { received, expected, .. } => {
                (*received).min(*expected) as f64 / *expected as f64 * 100.0
            }
            Self::Done => 100.0,
        }
    }

    /// Text for the progress indicator, if generation is running. N names the
    /// element being written, one past those already received.
    pub fn progress_label(&self) -> Option<String> {
        match self {
            Self::InProgress { received: 0, .. } => Some("Analyzing content...".to_string()),
            Self::InProgress { kind, received, expected } => Some(format!(
                "Generating {} {} of {}",
                kind.item_noun(),
                (*received + 1).min(*expected),
                expected
            )),
            _ => None,
        }
    }
}

/// Message shown after any failed generation. Details go to the log only.
pub fn failure_notice(kind: ArtifactKind) -> String {
    format!("Failed to generate {}. Please try again.", kind)
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub mode: ArtifactKind,
    pub title: Option<String>,
    pub selected_files: Vec<UploadedFile>,
    pub status: GenerationStatus,
    pub artifact: Option<GeneratedArtifact>,
    /// Shown after a selection dropped files.
    pub upload_notice: Option<String>,
}

impl AppState {
    pub fn new(mode: ArtifactKind) -> Self {
        Self { mode, ..Self::default() }
    }

    /// Replace the selection with the acceptable PDFs among `files`.
    /// Returns what was rejected.
    pub fn select_files(&mut self, files: Vec<UploadedFile>) -> Vec<UploadError> {
        let selection = validate_selection(files);
        if !selection.rejected.is_empty() {
            warn!(rejected = selection.rejected.len(), "some files were not accepted");
        }
        self.selected_files = selection.accepted;
        self.upload_notice = selection.notice.map(str::to_string);
        selection.rejected
    }

    /// Start generating `expected` elements for the current mode.
    pub fn begin_generation(&mut self, expected: usize) -> Result<(), UploadError> {
        if self.selected_files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        info!(mode = %self.mode, expected, "generation started");
        self.title = Some(self.mode.to_string());
        self.artifact = None;
        self.status = GenerationStatus::InProgress { kind: self.mode, received: 0, expected };
        Ok(())
    }

    /// Update the element count of a running generation.
    pub fn record_progress(&mut self, received: usize) {
        if let GenerationStatus::InProgress { received: r, .. } = &mut self.status {
            *r = received;
        }
    }

    pub fn complete(&mut self, artifact: GeneratedArtifact) {
        info!(mode = %artifact.kind(), "generation finished");
        self.mode = artifact.kind();
        self.artifact = Some(artifact);
        self.status = GenerationStatus::Done;
    }

    /// Mark the generation failed. The selection is discarded.
    pub fn fail(&mut self) {
        warn!(mode = %self.mode, "generation failed");
        self.selected_files.clear();
        self.artifact = None;
        self.status = GenerationStatus::Failed { notice: failure_notice(self.mode) };
    }

    /// Drop the artifact and go back to picking a file.
    pub fn start_over(&mut self) {
        self.artifact = None;
        self.title = None;
        self.selected_files.clear();
        self.upload_notice = None;
        self.status = GenerationStatus::Idle;
    }

    /// Generate an artifact for the current mode from the first selected file,
    /// reporting every status change to `on_progress`.
    ///
    /// On any failure the state ends up `Failed` with the generic notice and
    /// the selection cleared; the detailed error is returned for logging.
    pub async fn run_generation<C: LowLevelClient>(
        &mut self,
        generator: &ArtifactGenerator<C>,
        on_progress: &mut (dyn FnMut(&GenerationStatus) + Send),
    ) -> Result<(), GenerationError> {
        let result = match self.mode {
            ArtifactKind::Quiz => self.drive::<Question, C>(generator, on_progress).await,
            ArtifactKind::Flashcards => self.drive::<FlashCard, C>(generator, on_progress).await,
            ArtifactKind::Matching => self.drive::<MatchingSet, C>(generator, on_progress).await,
        };
        match result {
            Ok(artifact) => {
                self.complete(artifact);
                on_progress(&self.status);
                Ok(())
            }
            Err(e) => {
                error!(mode = %self.mode, error = %e, "generation error");
                self.fail();
                on_progress(&self.status);
                Err(e)
            }
        }
    }

    async fn drive<T: Artifact, C: LowLevelClient>(
        &mut self,
        generator: &ArtifactGenerator<C>,
        on_progress: &mut (dyn FnMut(&GenerationStatus) + Send),
    ) -> Result<GeneratedArtifact, GenerationError> {
        let document = PdfDocument::from_first(&self.selected_files)?;
        self.begin_generation(T::expected_count(generator.config()))?;
        on_progress(&self.status);

        let mut events = generator.stream::<T>(document).await?;
        while let Some(event) = events.next().await {
            match event? {
                GenerationEvent::Element { index, .. } => {
                    self.record_progress(index + 1);
                    on_progress(&self.status);
                }
                GenerationEvent::Complete { items } => {
                    return T::into_generated(items).ok_or_else(|| GenerationError::NoArtifactFound(String::new()));
                }
            }
        }
        Err(GenerationError::NoArtifactFound(String::new()))
    }

    pub fn notice(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Failed { notice } => Some(notice),
            _ => self.upload_notice.as_deref(),
        }
    }
}
