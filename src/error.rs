use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Schema validation failed:\n{0}")]
    Validation(#[from] ValidationError),
    #[error("JSON deserialization error: {0}. Raw response: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
    #[error("No artifact found in model output. Raw response: {0}")]
    NoArtifactFound(String),
    #[error("Generation exceeded the {0:?} execution ceiling")]
    TimedOut(Duration),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Mock client error: {0}")]
    Mock(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("No files were provided")]
    NoFiles,
    #[error("{name}: unsupported type '{mime_type}', only application/pdf is accepted")]
    UnsupportedType { name: String, mime_type: String },
    #[error("{name}: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { name: String, size: usize, limit: usize },
    #[error("{name}: invalid base64 payload: {reason}")]
    InvalidEncoding { name: String, reason: String },
}

/// One broken rule in a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted location of the offending value, e.g. `[2].options`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_issues(.0))]
pub struct ValidationError(pub Vec<ValidationIssue>);

impl ValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ValidationError(vec![
            ValidationIssue::new("", "Expected 4 items, received 3"),
            ValidationIssue::new("[1].description", "Description cannot be empty"),
        ]);
        assert_eq!(
            err.to_string(),
            "Expected 4 items, received 3\n[1].description: Description cannot be empty"
        );
    }
}
