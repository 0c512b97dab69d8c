//! Interactive sessions over generated artifacts.

pub mod flashcards;
pub mod matching;
pub mod quiz;

pub use flashcards::FlashcardDeck;
pub use matching::{Card, CardSide, CardState, FlipOutcome, MatchingGame, MISMATCH_DELAY};
pub use quiz::{QuizScore, QuizSession};
