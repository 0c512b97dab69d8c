pub mod app;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod generator;
pub mod interceptors;
pub mod json_utils;
pub mod schema;
pub mod server;
pub mod streaming;
pub mod terminal;
pub mod upload;

// Convenient re-exports
pub use app::{AppState, GenerationStatus};
pub use error::{AIError, GenerationError, UploadError, ValidationError};
pub use generator::{ArtifactGenerator, GeneratorConfig};
pub use schema::{ArtifactKind, FlashCard, GeneratedArtifact, MatchingPair, MatchingSet, Question};
pub use streaming::GenerationEvent;
