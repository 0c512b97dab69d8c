//! Memory-match game over a [`MatchingSet`].
//!
//! Every pair becomes two cards, a term and a definition. The player flips two
//! cards at a time; a term and its definition stay matched, anything else is
//! turned back face-down once the caller settles the comparison.

use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{MatchingPair, MatchingSet};

/// How long a mismatched pair stays visible before it is turned back.
pub const MISMATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSide {
    Term,
    Definition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    FaceDown,
    FaceUp,
    Matched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// `term-<term>` or `definition-<term>`.
    pub id: String,
    pub content: String,
    pub side: CardSide,
    pub state: CardState,
}

impl Card {
    pub fn is_face_up(&self) -> bool {
        self.state == CardState::FaceUp
    }

    pub fn is_matched(&self) -> bool {
        self.state == CardState::Matched
    }
}

/// What a single `flip` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Nothing changed.
    Ignored,
    /// First card of a comparison is now face-up.
    FlippedFirst,
    /// The two face-up cards were a pair.
    Matched { complete: bool },
    /// The two face-up cards were not a pair. Call [`MatchingGame::settle`]
    /// after `settle_after` to turn them back.
    Mismatch { settle_after: Duration },
}

#[derive(Debug)]
pub struct MatchingGame {
    title: String,
    description: Option<String>,
    pairs: Vec<MatchingPair>,
    cards: Vec<Card>,
    /// Indices into `cards` of face-up, unmatched cards. Never more than two.
    face_up: Vec<usize>,
    moves: u32,
    matches: usize,
    rng: StdRng,
}

impl MatchingGame {
    pub fn new(set: &MatchingSet) -> Self {
        Self::with_rng(set, StdRng::from_entropy())
    }

    /// Deterministic shuffling for tests and replays.
    pub fn with_seed(set: &MatchingSet, seed: u64) -> Self {
        Self::with_rng(set, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(set: &MatchingSet, rng: StdRng) -> Self {
        let mut game = Self {
            title: set.title.clone(),
            description: set.description.clone(),
            pairs: set.pairs.clone(),
            cards: Vec::new(),
            face_up: Vec::new(),
            moves: 0,
            matches: 0,
            rng,
        };
        game.deal();
        game
    }

    fn deal(&mut self) {
        let mut seen = HashSet::new();
        let mut cards = Vec::with_capacity(self.pairs.len() * 2);
        for pair in &self.pairs {
            // Repeated terms would collide on the card id
            let key = if seen.insert(pair.term.clone()) {
                pair.term.clone()
            } else {
                format!("{}#{}", pair.term, cards.len() / 2)
            };
            cards.push(Card {
                id: format!("term-{}", key),
                content: pair.term.clone(),
                side: CardSide::Term,
                state: CardState::FaceDown,
            });
            cards.push(Card {
                id: format!("definition-{}", key),
                content: pair.definition.clone(),
                side: CardSide::Definition,
                state: CardState::FaceDown,
            });
        }
        cards.shuffle(&mut self.rng);
        self.cards = cards;
    }

    /// Flip the card with `id`.
    pub fn flip(&mut self, id: &str) -> FlipOutcome {
        if self.face_up.len() >= 2 {
            debug!(target: "studygen::matching", id, "comparison pending, flip ignored");
            return FlipOutcome::Ignored;
        }
        let Some(index) = self.cards.iter().position(|c| c.id == id) else {
            return FlipOutcome::Ignored;
        };
        if self.cards[index].state != CardState::FaceDown {
            return FlipOutcome::Ignored;
        }

        self.cards[index].state = CardState::FaceUp;
        self.face_up.push(index);
        if self.face_up.len() == 1 {
            return FlipOutcome::FlippedFirst;
        }

        self.moves += 1;
        let (first, second) = (self.face_up[0], self.face_up[1]);
        if self.is_pair(&self.cards[first], &self.cards[second]) {
            self.cards[first].state = CardState::Matched;
            self.cards[second].state = CardState::Matched;
            self.face_up.clear();
            self.matches += 1;
            debug!(target: "studygen::matching", moves = self.moves, matches = self.matches, "pair matched");
            FlipOutcome::Matched { complete: self.is_complete() }
        } else {
            debug!(target: "studygen::matching", moves = self.moves, "mismatch");
            FlipOutcome::Mismatch { settle_after: MISMATCH_DELAY }
        }
    }

    /// One term card and one definition card whose definition belongs to that term.
    fn is_pair(&self, a: &Card, b: &Card) -> bool {
        let (term, definition) = match (a.side, b.side) {
            (CardSide::Term, CardSide::Definition) => (a, b),
            (CardSide::Definition, CardSide::Term) => (b, a),
            _ => return false,
        };
        self.pairs
            .iter()
            .any(|p| p.definition == definition.content && p.term == term.content)
    }

    /// Turn a mismatched comparison back face-down. Returns whether anything changed.
    pub fn settle(&mut self) -> bool {
        if self.face_up.len() < 2 {
            return false;
        }
        for index in self.face_up.drain(..) {
            self.cards[index].state = CardState::FaceDown;
        }
        true
    }

    /// Reshuffle every card face-down and zero the counters.
    pub fn restart(&mut self) {
        self.face_up.clear();
        self.moves = 0;
        self.matches = 0;
        self.deal();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn face_up_count(&self) -> usize {
        self.face_up.len()
    }

    /// True when a mismatch is waiting for [`settle`](Self::settle).
    pub fn is_comparing(&self) -> bool {
        self.face_up.len() == 2
    }

    pub fn is_complete(&self) -> bool {
        !self.pairs.is_empty() && self.matches == self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> MatchingSet {
        MatchingSet {
            title: "Biology".into(),
            description: None,
            pairs: vec![
                MatchingPair::new("Photosynthesis", "Light to chemical energy"),
                MatchingPair::new("Mitosis", "Cell division"),
                MatchingPair::new("Osmosis", "Water across a membrane"),
                MatchingPair::new("Enzyme", "Biological catalyst"),
            ],
        }
    }

    #[test]
    fn deals_two_cards_per_pair_face_down() {
        let game = MatchingGame::with_seed(&set(), 7);
        assert_eq!(game.cards().len(), 8);
        assert!(game.cards().iter().all(|c| c.state == CardState::FaceDown));
        assert!(game.card("term-Mitosis").is_some());
        assert_eq!(game.card("definition-Mitosis").map(|c| c.content.as_str()), Some("Cell division"));
    }

    #[test]
    fn flipping_same_card_twice_is_ignored() {
        let mut game = MatchingGame::with_seed(&set(), 7);
        assert_eq!(game.flip("term-Osmosis"), FlipOutcome::FlippedFirst);
        assert_eq!(game.flip("term-Osmosis"), FlipOutcome::Ignored);
        assert_eq!(game.flip("term-Unknown"), FlipOutcome::Ignored);
        assert_eq!(game.moves(), 0);
    }

    #[test]
    fn two_terms_never_match() {
        let mut game = MatchingGame::with_seed(&set(), 7);
        game.flip("term-Osmosis");
        assert!(matches!(game.flip("term-Enzyme"), FlipOutcome::Mismatch { .. }));
        assert!(game.settle());
        assert!(!game.settle());
    }

    #[test]
    fn restart_resets_counters_and_cards() {
        let mut game = MatchingGame::with_seed(&set(), 7);
        game.flip("term-Enzyme");
        game.flip("definition-Enzyme");
        game.flip("term-Osmosis");
        game.restart();

        assert_eq!(game.moves(), 0);
        assert_eq!(game.matches(), 0);
        assert_eq!(game.face_up_count(), 0);
        assert!(game.cards().iter().all(|c| c.state == CardState::FaceDown));
    }

    #[test]
    fn repeated_terms_get_distinct_ids() {
        let mut s = set();
        s.pairs.push(MatchingPair::new("Enzyme", "Protein that speeds up reactions"));
        let game = MatchingGame::with_seed(&s, 1);
        let ids: HashSet<_> = game.cards().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }
}
