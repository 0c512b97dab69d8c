//! Artifact records exchanged between the model endpoint and the study views.
//!
//! Every record derives [`JsonSchema`]; the field docs end up in the schema the
//! generator embeds in the prompt, so they double as instructions to the model.
//! Validation is strict: an artifact that breaks any rule is rejected as a
//! whole, it is never patched up.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationIssue};

pub const QUIZ_QUESTION_COUNT: usize = 4;
pub const QUIZ_OPTION_COUNT: usize = 4;
pub const FLASHCARD_COUNT: usize = 4;
pub const MATCHING_SET_COUNT: usize = 1;
pub const MIN_MATCHING_PAIRS: usize = 4;
pub const MAX_MATCHING_PAIRS: usize = 20;
pub const DEFAULT_MATCHING_PAIRS: usize = 8;

/// Learning mode, which is also the kind of artifact to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Quiz,
    Flashcards,
    Matching,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Quiz, Self::Flashcards, Self::Matching];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Flashcards => "flashcards",
            Self::Matching => "matching",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Quiz => "Practice Quiz",
            Self::Flashcards => "Flashcards",
            Self::Matching => "Matching Game",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Quiz => "Test knowledge with various choose the correct answer questions",
            Self::Flashcards => "Memorize key terms and concepts",
            Self::Matching => "Connect related terms and definitions",
        }
    }

    /// Noun used in progress messages ("Generating question 2 of 4").
    pub fn item_noun(&self) -> &'static str {
        match self {
            Self::Quiz => "question",
            Self::Flashcards => "flashcard",
            Self::Matching => "matching set",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiz" => Ok(Self::Quiz),
            "flashcards" | "flashcard" => Ok(Self::Flashcards),
            "matching" => Ok(Self::Matching),
            _ => Err(format!("Unknown learning mode: '{}'. Supported: quiz, flashcards, matching", s)),
        }
    }
}

/// Correct-answer tag of a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum AnswerLabel {
    A,
    B,
    C,
    D,
}

impl AnswerLabel {
    pub const ALL: [AnswerLabel; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for AnswerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Question", description = "A multiple choice question about the document")]
pub struct Question {
    pub question: String,
    /// Four possible answers to the question. Only one should be correct. They should all be of equal lengths.
    #[schemars(length(min = 4, max = 4))]
    pub options: Vec<String>,
    /// The correct answer, where A is the first option, B is the second, and so on.
    pub answer: AnswerLabel,
}

impl Question {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.answer.index()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Flashcard")]
pub struct FlashCard {
    pub question: String,
    /// A detailed description or context of the question, providing additional clarity or explanation.
    #[schemars(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Matching Pair")]
pub struct MatchingPair {
    /// Unique identifier for the pair (auto-generated if not provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The term or question to be matched
    #[schemars(length(min = 1))]
    pub term: String,
    /// The definition or answer that matches the term
    #[schemars(length(min = 1))]
    pub definition: String,
}

impl MatchingPair {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self { id: None, term: term.into(), definition: definition.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Matching Game Set")]
pub struct MatchingSet {
    /// Title of the matching game set
    #[schemars(length(min = 1))]
    pub title: String,
    /// Brief description of the matching game set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Array of term-definition pairs for the matching game
    #[schemars(length(min = 4, max = 20))]
    pub pairs: Vec<MatchingPair>,
}

/// A record type the model can be asked to produce as a JSON array.
pub trait Artifact: DeserializeOwned + Serialize + JsonSchema + Clone + Send + Sync + 'static {
    const KIND: ArtifactKind;

    /// Number of elements the generated array must contain.
    fn expected_count(config: &crate::generator::GeneratorConfig) -> usize;

    fn system_prompt(config: &crate::generator::GeneratorConfig) -> String;

    fn instruction() -> &'static str;

    /// Push every rule this record breaks onto `issues`, prefixing paths with `path`.
    fn check(&self, path: &str, config: &crate::generator::GeneratorConfig, issues: &mut Vec<ValidationIssue>);

    fn into_generated(items: Vec<Self>) -> Option<GeneratedArtifact>;
}

impl Artifact for Question {
    const KIND: ArtifactKind = ArtifactKind::Quiz;

    fn expected_count(_config: &crate::generator::GeneratorConfig) -> usize {
        QUIZ_QUESTION_COUNT
    }

    fn system_prompt(_config: &crate::generator::GeneratorConfig) -> String {
        format!(
            "You are a teacher. Your job is to take a document, and create a multiple choice test (with {} questions) based on the content of the document. Each option should be roughly equal in length.",
            QUIZ_QUESTION_COUNT
        )
    }

    fn instruction() -> &'static str {
        "Create a multiple choice test based on this document."
    }

    fn check(&self, path: &str, _config: &crate::generator::GeneratorConfig, issues: &mut Vec<ValidationIssue>) {
        if self.question.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{}.question", path), "Question cannot be empty"));
        }
        if self.options.len() != QUIZ_OPTION_COUNT {
            issues.push(ValidationIssue::new(
                format!("{}.options", path),
                format!("Expected {} options, received {}", QUIZ_OPTION_COUNT, self.options.len()),
            ));
        }
    }

    fn into_generated(items: Vec<Self>) -> Option<GeneratedArtifact> {
        Some(GeneratedArtifact::Quiz(items))
    }
}

impl Artifact for FlashCard {
    const KIND: ArtifactKind = ArtifactKind::Flashcards;

    fn expected_count(_config: &crate::generator::GeneratorConfig) -> usize {
        FLASHCARD_COUNT
    }

    fn system_prompt(_config: &crate::generator::GeneratorConfig) -> String {
        format!(
            "You are a teacher. Your job is to take a document, and create flashcards (with {} flashCards) based on the content of the document. each flashCard should be roughly equal in length.",
            FLASHCARD_COUNT
        )
    }

    fn instruction() -> &'static str {
        "Create flashcards based on this document."
    }

    fn check(&self, path: &str, _config: &crate::generator::GeneratorConfig, issues: &mut Vec<ValidationIssue>) {
        if self.question.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{}.question", path), "Question cannot be empty"));
        }
        if self.description.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{}.description", path), "Description cannot be empty"));
        }
    }

    fn into_generated(items: Vec<Self>) -> Option<GeneratedArtifact> {
        Some(GeneratedArtifact::Flashcards(items))
    }
}

impl Artifact for MatchingSet {
    const KIND: ArtifactKind = ArtifactKind::Matching;

    fn expected_count(_config: &crate::generator::GeneratorConfig) -> usize {
        MATCHING_SET_COUNT
    }

    fn system_prompt(config: &crate::generator::GeneratorConfig) -> String {
        format!(
            "You are a teacher. Your job is to take a document and create matching pairs (terms and definitions) for a memory match game. Generate exactly {} pairs, where each term has a corresponding definition. Ensure the terms and definitions are clear, concise, and directly related to the content of the document.",
            config.matching_pairs
        )
    }

    fn instruction() -> &'static str {
        "Create matching pairs for a memory match game based on this document."
    }

    fn check(&self, path: &str, config: &crate::generator::GeneratorConfig, issues: &mut Vec<ValidationIssue>) {
        check_matching_set(self, path, issues);
        if self.pairs.len() != config.matching_pairs {
            issues.push(ValidationIssue::new(
                format!("{}.pairs", path),
                format!("Expected exactly {} pairs, received {}", config.matching_pairs, self.pairs.len()),
            ));
        }
    }

    fn into_generated(mut items: Vec<Self>) -> Option<GeneratedArtifact> {
        if items.len() == MATCHING_SET_COUNT {
            items.pop().map(GeneratedArtifact::Matching)
        } else {
            None
        }
    }
}

/// Rules every matching set obeys, independent of the configured pair count.
fn check_matching_set(set: &MatchingSet, path: &str, issues: &mut Vec<ValidationIssue>) {
    if set.title.trim().is_empty() {
        issues.push(ValidationIssue::new(format!("{}.title", path), "Title cannot be empty"));
    }
    if set.pairs.len() < MIN_MATCHING_PAIRS {
        issues.push(ValidationIssue::new(
            format!("{}.pairs", path),
            "At least 4 pairs are required for a matching game",
        ));
    }
    if set.pairs.len() > MAX_MATCHING_PAIRS {
        issues.push(ValidationIssue::new(
            format!("{}.pairs", path),
            "Maximum of 20 pairs allowed for a matching game",
        ));
    }
    for (i, pair) in set.pairs.iter().enumerate() {
        if pair.term.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{}.pairs[{}].term", path, i), "Term cannot be empty"));
        }
        if pair.definition.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("{}.pairs[{}].definition", path, i),
                "Definition cannot be empty",
            ));
        }
    }
}

impl MatchingSet {
    /// Structural validation for sets that did not come from the generator,
    /// e.g. a saved artifact loaded for play.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        check_matching_set(self, "", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(issues))
        }
    }
}

/// Validate a complete generated array: exact element count plus every record.
pub fn validate_artifact<T: Artifact>(
    items: &[T],
    config: &crate::generator::GeneratorConfig,
) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    let expected = T::expected_count(config);
    if items.len() != expected {
        issues.push(ValidationIssue::new(
            "",
            format!("Expected {} items, received {}", expected, items.len()),
        ));
    }
    for (i, item) in items.iter().enumerate() {
        item.check(&format!("[{}]", i), config, &mut issues);
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(issues))
    }
}

/// A validated artifact ready for one of the study views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "artifact", rename_all = "lowercase")]
pub enum GeneratedArtifact {
    Quiz(Vec<Question>),
    Flashcards(Vec<FlashCard>),
    Matching(MatchingSet),
}

impl GeneratedArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Quiz(_) => ArtifactKind::Quiz,
            Self::Flashcards(_) => ArtifactKind::Flashcards,
            Self::Matching(_) => ArtifactKind::Matching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;

    fn question(options: usize) -> Question {
        Question {
            question: "What powers photosynthesis?".to_string(),
            options: (0..options).map(|i| format!("Option {}", i)).collect(),
            answer: AnswerLabel::B,
        }
    }

    fn matching_set(pairs: usize) -> MatchingSet {
        MatchingSet {
            title: "Cell biology".to_string(),
            description: None,
            pairs: (0..pairs).map(|i| MatchingPair::new(format!("term {}", i), format!("definition {}", i))).collect(),
        }
    }

    #[test]
    fn answer_label_round_trips_as_bare_letter() {
        let json = serde_json::to_string(&AnswerLabel::C).unwrap();
        assert_eq!(json, "\"C\"");
        assert_eq!(AnswerLabel::from_index(2), Some(AnswerLabel::C));
        assert_eq!(AnswerLabel::from_index(4), None);
    }

    #[test]
    fn quiz_requires_exactly_four_questions_with_four_options() {
        let config = GeneratorConfig::default();
        let good = vec![question(4), question(4), question(4), question(4)];
        assert!(validate_artifact(&good, &config).is_ok());

        let short = vec![question(4), question(4), question(4)];
        let err = validate_artifact(&short, &config).unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected 4 items, received 3");

        let bad_options = vec![question(4), question(3), question(4), question(4)];
        let err = validate_artifact(&bad_options, &config).unwrap_err();
        assert_eq!(err.issues()[0].path, "[1].options");
    }

    #[test]
    fn unknown_answer_label_fails_to_deserialize() {
        let raw = r#"{"question":"q","options":["a","b","c","d"],"answer":"E"}"#;
        assert!(serde_json::from_str::<Question>(raw).is_err());
    }

    #[test]
    fn flashcard_description_must_not_be_empty() {
        let config = GeneratorConfig::default();
        let mut cards = vec![
            FlashCard { question: "q".into(), description: "d".into() };
            FLASHCARD_COUNT
        ];
        cards[3].description = "  ".into();
        let err = validate_artifact(&cards, &config).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].to_string(), "[3].description: Description cannot be empty");
    }

    #[test]
    fn matching_set_needs_configured_pair_count() {
        let config = GeneratorConfig::default();
        assert!(validate_artifact(&[matching_set(8)], &config).is_ok());

        let err = validate_artifact(&[matching_set(6)], &config).unwrap_err();
        assert!(err.to_string().contains("Expected exactly 8 pairs"));

        let custom = GeneratorConfig { matching_pairs: 6, ..GeneratorConfig::default() };
        assert!(validate_artifact(&[matching_set(6)], &custom).is_ok());
    }

    #[test]
    fn matching_set_range_applies_to_loaded_sets() {
        assert!(matching_set(4).validate().is_ok());
        assert!(matching_set(20).validate().is_ok());
        assert!(matching_set(3).validate().is_err());
        assert!(matching_set(21).validate().is_err());

        let mut blank = matching_set(5);
        blank.pairs[0].term.clear();
        let err = blank.validate().unwrap_err();
        assert_eq!(err.issues()[0].path, ".pairs[0].term");
    }

    #[test]
    fn matching_schema_describes_pairs() {
        let schema = schemars::schema_for!(MatchingSet);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("Array of term-definition pairs for the matching game"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Quiz".parse::<ArtifactKind>(), Ok(ArtifactKind::Quiz));
        assert_eq!("matching".parse::<ArtifactKind>(), Ok(ArtifactKind::Matching));
        assert!("essay".parse::<ArtifactKind>().is_err());
    }
}
