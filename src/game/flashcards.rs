use crate::schema::FlashCard;

/// Browsing a flashcard deck: one card at a time, question side first.
#[derive(Debug, Clone)]
pub struct FlashcardDeck {
    cards: Vec<FlashCard>,
    current: usize,
    flipped: bool,
    progress: f64,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<FlashCard>) -> Self {
        Self { cards, current: 0, flipped: false, progress: 0.0 }
    }

    pub fn current(&self) -> Option<&FlashCard> {
        self.cards.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Showing the description side.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 >= self.cards.len() {
            return false;
        }
        self.current += 1;
        self.flipped = false;
        self.progress = (self.current + 1) as f64 / self.cards.len() as f64 * 100.0;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.flipped = false;
        self.progress = (self.current + 1) as f64 / self.cards.len() as f64 * 100.0;
        true
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress
    }

    pub fn can_start_over(&self) -> bool {
        !self.cards.is_empty() && self.current == self.cards.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> FlashcardDeck {
        FlashcardDeck::new(
            (1..=4)
                .map(|i| FlashCard { question: format!("q{}", i), description: format!("d{}", i) })
                .collect(),
        )
    }

    #[test]
    fn next_advances_progress_and_unflips() {
        let mut deck = deck();
        assert_eq!(deck.progress_percent(), 0.0);
        deck.flip();
        assert!(deck.next());
        assert!(!deck.is_flipped());
        assert_eq!(deck.progress_percent(), 50.0);
        assert!(deck.previous());
        assert_eq!(deck.progress_percent(), 25.0);
        assert!(!deck.previous());
    }

    #[test]
    fn previous_progress_tracks_the_shown_card() {
        let mut deck = deck();
        deck.next();
        deck.next();
        assert_eq!(deck.progress_percent(), 75.0);
        assert!(deck.previous());
        assert_eq!(deck.current_index(), 1);
        assert_eq!(deck.progress_percent(), 50.0);
    }

    #[test]
    fn start_over_only_on_last_card() {
        let mut deck = deck();
        while deck.next() {
            if deck.current_index() < 3 {
                assert!(!deck.can_start_over());
            }
        }
        assert_eq!(deck.current_index(), 3);
        assert!(deck.can_start_over());
        assert_eq!(deck.progress_percent(), 100.0);
        assert!(!deck.next());
    }
}
