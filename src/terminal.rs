//! Terminal views for generated artifacts (`studygen play`).
//!
//! Rendering is plain text so it can be checked without a terminal; the
//! `play_*` loops put the terminal in raw mode and map keys onto the session
//! state machines in [`crate::game`].

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{self, Clear, ClearType},
};
use tracing::debug;

use crate::game::{CardState, FlashcardDeck, FlipOutcome, MatchingGame, QuizSession};
use crate::schema::{AnswerLabel, ArtifactKind, FlashCard, GeneratedArtifact, MatchingSet, Question};

/// Restores cooked mode when dropped, including on early returns.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_key() -> io::Result<KeyCode> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key.code);
            }
        }
    }
}

// Raw mode does not translate '\n'
fn draw(out: &mut impl Write, screen: &str) -> io::Result<()> {
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    for line in screen.lines() {
        write!(out, "{}\r\n", line)?;
    }
    out.flush()
}

/// The learning modes with their labels, as offered when picking one.
pub fn render_modes() -> String {
    ArtifactKind::ALL
        .iter()
        .map(|kind| format!("{:<11} {}: {}\n", kind.as_str(), kind.label(), kind.description()))
        .collect()
}

/// Run the view for whatever `artifact` holds until the user quits.
pub fn play(artifact: &GeneratedArtifact) -> io::Result<()> {
    match artifact {
        GeneratedArtifact::Quiz(questions) => play_quiz(questions.clone()),
        GeneratedArtifact::Flashcards(cards) => play_flashcards(cards.clone()),
        GeneratedArtifact::Matching(set) => play_matching(set),
    }
}

pub fn render_quiz(session: &QuizSession) -> String {
    let mut screen = String::new();
    let total = session.questions().len();
    let Some(question) = session.current_question() else {
        return "No questions.".to_string();
    };
    let selected = session.answer(session.current_index());
    let score = session.score();

    screen.push_str(&format!(
        "Question {} of {}   ({:.0}% answered)\n\n{}\n\n",
        session.current_index() + 1,
        total,
        session.progress_percent(),
        question.question
    ));
    for (i, option) in question.options.iter().enumerate() {
        let Some(label) = AnswerLabel::from_index(i) else { break };
        let mut marker = if selected == Some(label) { ">" } else { " " }.to_string();
        if score.is_some() {
            if label == question.answer {
                marker = "✓".to_string();
            } else if selected == Some(label) {
                marker = "✗".to_string();
            }
        }
        screen.push_str(&format!("{} {}. {}\n", marker, label, option));
    }

    match score {
        Some(score) => screen.push_str(&format!(
            "\nYou scored {}% ({} of {} correct)\n[r] reset  [n/p] review  [q] quit\n",
            score.percent(),
            score.correct,
            score.total
        )),
        None => screen.push_str("\n[a-d] answer  [n] next  [p] previous  [s] submit  [q] quit\n"),
    }
    screen
}

pub fn render_flashcards(deck: &FlashcardDeck) -> String {
    let Some(card) = deck.current() else {
        return "No flashcards.".to_string();
    };
    let face = if deck.is_flipped() { &card.description } else { &card.question };
    let mut screen = format!(
        "Card {} of {}   ({:.0}%)\n\n{}\n\n[space] flip  [n] next  [p] previous",
        deck.current_index() + 1,
        deck.len(),
        deck.progress_percent(),
        face
    );
    if deck.can_start_over() {
        screen.push_str("  [s] start over");
    }
    screen.push_str("  [q] quit\n");
    screen
}

pub fn render_matching(game: &MatchingGame) -> String {
    let mut screen = format!("{}\n", game.title());
    if let Some(description) = game.description() {
        screen.push_str(&format!("{}\n", description));
    }
    screen.push_str(&format!(
        "\nMoves: {}   Matches: {}/{}\n\n",
        game.moves(),
        game.matches(),
        game.pair_count()
    ));
    for (i, card) in game.cards().iter().enumerate() {
        let face = match card.state {
            CardState::FaceDown => "?".to_string(),
            CardState::FaceUp => card.content.clone(),
            CardState::Matched => format!("{} (matched)", card.content),
        };
        screen.push_str(&format!("{:>3}. {}\n", i + 1, face));
    }
    if game.is_complete() {
        screen.push_str(&format!(
            "\nCongratulations! You completed the game in {} moves.\n[r] play again  [q] quit\n",
            game.moves()
        ));
    } else {
        screen.push_str("\nType a card number and press Enter.  [r] restart  [q] quit\n");
    }
    screen
}

pub fn play_quiz(questions: Vec<Question>) -> io::Result<()> {
    let mut session = QuizSession::new(questions);
    let mut out = io::stdout();
    let _raw = RawMode::enable()?;

    loop {
        draw(&mut out, &render_quiz(&session))?;
        match read_key()? {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char(c @ 'a'..='d') => {
                if let Some(label) = AnswerLabel::from_index((c as u8 - b'a') as usize) {
                    session.select(label);
                }
            }
            KeyCode::Char('n') | KeyCode::Right => {
                session.next();
            }
            KeyCode::Char('p') | KeyCode::Left => {
                session.previous();
            }
            KeyCode::Char('s') => {
                if session.submit().is_none() {
                    debug!(answered = session.answered_count(), "submit ignored, quiz incomplete");
                }
            }
            KeyCode::Char('r') => session.reset(),
            _ => {}
        }
    }
    Ok(())
}

pub fn play_flashcards(cards: Vec<FlashCard>) -> io::Result<()> {
    let mut deck = FlashcardDeck::new(cards.clone());
    let mut out = io::stdout();
    let _raw = RawMode::enable()?;

    loop {
        draw(&mut out, &render_flashcards(&deck))?;
        match read_key()? {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char(' ') | KeyCode::Enter => deck.flip(),
            KeyCode::Char('n') | KeyCode::Right => {
                deck.next();
            }
            KeyCode::Char('p') | KeyCode::Left => {
                deck.previous();
            }
            KeyCode::Char('s') if deck.can_start_over() => deck = FlashcardDeck::new(cards.clone()),
            _ => {}
        }
    }
    Ok(())
}

pub fn play_matching(set: &MatchingSet) -> io::Result<()> {
    let mut game = MatchingGame::new(set);
    let mut out = io::stdout();
    let _raw = RawMode::enable()?;
    let mut typed = String::new();

    loop {
        let mut screen = render_matching(&game);
        if !typed.is_empty() {
            screen.push_str(&format!("> {}\n", typed));
        }
        draw(&mut out, &screen)?;

        match read_key()? {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('r') => {
                typed.clear();
                game.restart();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => typed.push(c),
            KeyCode::Backspace => {
                typed.pop();
            }
            KeyCode::Enter => {
                let picked = typed.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
                typed.clear();
                let Some(id) = picked.and_then(|i| game.cards().get(i)).map(|c| c.id.clone()) else {
                    continue;
                };
                if let FlipOutcome::Mismatch { settle_after } = game.flip(&id) {
                    draw(&mut out, &render_matching(&game))?;
                    std::thread::sleep(settle_after);
                    game.settle();
                }
            }
            _ => {}
        }
    }
    Ok(())
}
