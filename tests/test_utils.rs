#![allow(dead_code)]

use studygen::clients::{FlexibleClient, MockHandle, MockResponse};
use studygen::schema::{AnswerLabel, FlashCard, MatchingPair, MatchingSet, Question};
use studygen::upload::{UploadedFile, PDF_MIME_TYPE};
use studygen::{ArtifactGenerator, GeneratorConfig};

use std::sync::Arc;

/// A tiny but well-formed upload.
pub fn sample_pdf() -> UploadedFile {
    UploadedFile::from_bytes("biology.pdf", PDF_MIME_TYPE, b"%PDF-1.4\n1 0 obj << >> endobj\n%%EOF")
}

pub fn quiz() -> Vec<Question> {
    vec![
        question("What does chlorophyll absorb?", AnswerLabel::A),
        question("Where does the Krebs cycle happen?", AnswerLabel::C),
        question("Which molecule stores genetic information?", AnswerLabel::B),
        question("What do ribosomes build?", AnswerLabel::D),
    ]
}

fn question(text: &str, answer: AnswerLabel) -> Question {
    Question {
        question: text.to_string(),
        options: vec!["Light".into(), "DNA".into(), "Mitochondria".into(), "Proteins".into()],
        answer,
    }
}

pub fn flashcards() -> Vec<FlashCard> {
    vec![
        FlashCard { question: "Photosynthesis".into(), description: "Turning light into chemical energy".into() },
        FlashCard { question: "Mitosis".into(), description: "Division into two identical cells".into() },
        FlashCard { question: "Osmosis".into(), description: "Water moving across a membrane".into() },
        FlashCard { question: "Enzyme".into(), description: "A protein that speeds up reactions".into() },
    ]
}

pub fn biology_set() -> MatchingSet {
    MatchingSet {
        title: "Cell Biology".into(),
        description: Some("Core processes of the cell".into()),
        pairs: vec![
            MatchingPair::new("Photosynthesis", "Converting light into chemical energy"),
            MatchingPair::new("Mitosis", "Division into two identical daughter cells"),
            MatchingPair::new("Osmosis", "Diffusion of water across a membrane"),
            MatchingPair::new("Enzyme", "Protein that catalyses reactions"),
            MatchingPair::new("Ribosome", "Site of protein synthesis"),
            MatchingPair::new("Nucleus", "Holds the genetic material"),
            MatchingPair::new("ATP", "Energy currency of the cell"),
            MatchingPair::new("Meiosis", "Division producing gametes"),
        ],
    }
}

/// Serialize `items` and cut the text after every array element, the way a
/// model streams it.
pub fn chunked_array<T: serde::Serialize>(items: &[T]) -> Vec<String> {
    let mut chunks = vec!["[".to_string()];
    for (i, item) in items.iter().enumerate() {
        let mut chunk = serde_json::to_string(item).unwrap();
        if i + 1 < items.len() {
            chunk.push(',');
        }
        chunks.push(chunk);
    }
    chunks.push("]".to_string());
    chunks
}

pub fn mock_generator(responses: Vec<MockResponse>) -> (ArtifactGenerator<FlexibleClient>, Arc<MockHandle>) {
    let (client, handle) = FlexibleClient::mock_with_responses(responses);
    (ArtifactGenerator::new(client, GeneratorConfig::default()), handle)
}
