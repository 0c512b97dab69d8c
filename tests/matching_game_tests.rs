mod test_utils;

use studygen::game::{CardState, FlipOutcome, MatchingGame, MISMATCH_DELAY};
use test_utils::biology_set;

fn face_up_unmatched(game: &MatchingGame) -> usize {
    game.cards().iter().filter(|c| c.state == CardState::FaceUp).count()
}

#[test]
fn true_pair_is_matched() {
    let mut game = MatchingGame::with_seed(&biology_set(), 42);

    assert_eq!(game.flip("term-Photosynthesis"), FlipOutcome::FlippedFirst);
    assert_eq!(game.flip("definition-Photosynthesis"), FlipOutcome::Matched { complete: false });

    assert_eq!(game.matches(), 1);
    assert_eq!(game.moves(), 1);
    assert_eq!(game.card("term-Photosynthesis").unwrap().state, CardState::Matched);
    assert_eq!(game.card("definition-Photosynthesis").unwrap().state, CardState::Matched);
}

#[test]
fn definition_first_also_matches() {
    let mut game = MatchingGame::with_seed(&biology_set(), 42);
    game.flip("definition-Osmosis");
    assert!(matches!(game.flip("term-Osmosis"), FlipOutcome::Matched { .. }));
}

#[test]
fn wrong_pair_turns_back_after_settle() {
    let mut game = MatchingGame::with_seed(&biology_set(), 42);

    game.flip("term-Photosynthesis");
    assert_eq!(
        game.flip("definition-Mitosis"),
        FlipOutcome::Mismatch { settle_after: MISMATCH_DELAY }
    );
    assert_eq!(game.moves(), 1);
    assert_eq!(game.matches(), 0);
    assert_eq!(face_up_unmatched(&game), 2);

    // Nothing can be flipped while the comparison is pending
    assert_eq!(game.flip("term-Mitosis"), FlipOutcome::Ignored);
    assert_eq!(face_up_unmatched(&game), 2);

    assert!(game.settle());
    assert_eq!(game.card("term-Photosynthesis").unwrap().state, CardState::FaceDown);
    assert_eq!(game.card("definition-Mitosis").unwrap().state, CardState::FaceDown);
    assert_eq!(game.moves(), 1);
    assert_eq!(game.matches(), 0);
}

#[test]
fn matched_cards_cannot_be_flipped_again() {
    let mut game = MatchingGame::with_seed(&biology_set(), 42);
    game.flip("term-ATP");
    game.flip("definition-ATP");
    assert_eq!(game.flip("term-ATP"), FlipOutcome::Ignored);
    assert_eq!(game.moves(), 1);
}

#[test]
fn completes_after_every_pair_is_matched() {
    let set = biology_set();
    let mut game = MatchingGame::with_seed(&set, 7);

    for (i, pair) in set.pairs.iter().enumerate() {
        game.flip(&format!("term-{}", pair.term));
        let outcome = game.flip(&format!("definition-{}", pair.term));
        let last = i + 1 == set.pairs.len();
        assert_eq!(outcome, FlipOutcome::Matched { complete: last });
    }

    assert_eq!(game.matches(), 8);
    assert_eq!(game.pair_count(), 8);
    assert!(game.is_complete());
    assert_eq!(game.moves(), 8);
}

#[test]
fn never_more_than_two_cards_face_up() {
    let mut game = MatchingGame::with_seed(&biology_set(), 99);
    let ids: Vec<String> = game.cards().iter().map(|c| c.id.clone()).collect();

    // Flip cards in dealt order, settling only every other mismatch
    for (step, id) in ids.iter().cycle().take(64).enumerate() {
        if let FlipOutcome::Mismatch { .. } = game.flip(id) {
            if step % 2 == 0 {
                game.settle();
            }
        }
        assert!(face_up_unmatched(&game) <= 2);
        assert_eq!(face_up_unmatched(&game), game.face_up_count());
        if game.is_comparing() && step % 3 == 0 {
            game.settle();
        }
    }
}

#[test]
fn restart_reshuffles_and_resets() {
    let mut game = MatchingGame::with_seed(&biology_set(), 5);
    let before: Vec<String> = game.cards().iter().map(|c| c.id.clone()).collect();

    game.flip("term-Nucleus");
    game.flip("definition-Nucleus");
    game.restart();

    assert_eq!(game.moves(), 0);
    assert_eq!(game.matches(), 0);
    assert!(!game.is_complete());
    assert!(game.cards().iter().all(|c| c.state == CardState::FaceDown));

    let mut after: Vec<String> = game.cards().iter().map(|c| c.id.clone()).collect();
    let mut sorted_before = before.clone();
    sorted_before.sort();
    after.sort();
    assert_eq!(sorted_before, after);
}
