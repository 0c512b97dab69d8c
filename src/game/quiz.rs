use serde::{Deserialize, Serialize};

use crate::schema::{AnswerLabel, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl QuizScore {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Answering a generated quiz one question at a time.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    answers: Vec<Option<AnswerLabel>>,
    current: usize,
    score: Option<QuizScore>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        let answers = vec![None; questions.len()];
        Self { questions, answers, current: 0, score: None }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer(&self, index: usize) -> Option<AnswerLabel> {
        self.answers.get(index).copied().flatten()
    }

    /// Record an answer for the current question. Ignored after submission.
    pub fn select(&mut self, label: AnswerLabel) -> bool {
        if self.score.is_some() {
            return false;
        }
        match self.answers.get_mut(self.current) {
            Some(slot) => {
                *slot = Some(label);
                true
            }
            None => false,
        }
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn all_answered(&self) -> bool {
        !self.answers.is_empty() && self.answers.iter().all(Option::is_some)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn progress_percent(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.answered_count() as f64 / self.questions.len() as f64 * 100.0
    }

    /// Score the quiz. `None` until every question has an answer.
    pub fn submit(&mut self) -> Option<QuizScore> {
        if !self.all_answered() {
            return None;
        }
        let correct = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.answer))
            .count();
        let score = QuizScore { correct, total: self.questions.len() };
        self.score = Some(score);
        Some(score)
    }

    pub fn score(&self) -> Option<QuizScore> {
        self.score
    }

    pub fn is_submitted(&self) -> bool {
        self.score.is_some()
    }

    pub fn reset(&mut self) {
        self.answers.iter_mut().for_each(|a| *a = None);
        self.current = 0;
        self.score = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Vec<Question> {
        [AnswerLabel::A, AnswerLabel::B, AnswerLabel::C, AnswerLabel::D]
            .into_iter()
            .enumerate()
            .map(|(i, answer)| Question {
                question: format!("Question {}", i + 1),
                options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
                answer,
            })
            .collect()
    }

    #[test]
    fn submit_requires_every_answer() {
        let mut session = QuizSession::new(quiz());
        session.select(AnswerLabel::A);
        assert_eq!(session.submit(), None);
        assert_eq!(session.progress_percent(), 25.0);
    }

    #[test]
    fn scores_correct_answers() {
        let mut session = QuizSession::new(quiz());
        for label in [AnswerLabel::A, AnswerLabel::B, AnswerLabel::A, AnswerLabel::D] {
            session.select(label);
            session.next();
        }
        let score = session.submit().unwrap();
        assert_eq!(score, QuizScore { correct: 3, total: 4 });
        assert_eq!(score.percent(), 75);
        assert!(!session.select(AnswerLabel::C));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = QuizSession::new(quiz());
        assert!(!session.previous());
        for _ in 0..3 {
            assert!(session.next());
        }
        assert!(!session.next());
        assert_eq!(session.current_index(), 3);
    }

    #[test]
    fn reset_clears_answers_and_score() {
        let mut session = QuizSession::new(quiz());
        for _ in 0..4 {
            session.select(AnswerLabel::A);
            session.next();
        }
        session.submit();
        session.reset();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answered_count(), 0);
        assert!(session.score().is_none());
    }
}
