//! Quiz session lifecycle.
//!
//! A session is Open until every selected card has been answered or the
//! learner quits; either way it becomes Complete and stays there.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
  Open,
  Complete,
}

/// Transitions a correct caller never attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("quiz {quiz_id} is already complete")]
  AlreadyComplete { quiz_id: i64 },
  #[error("card {card_id} is not part of quiz {quiz_id}")]
  CardNotInQuiz { quiz_id: i64, card_id: i64 },
  #[error("card {card_id} was already answered in quiz {quiz_id}")]
  AlreadyAnswered { quiz_id: i64, card_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
  pub id: i64,
  pub account_id: i64,
  pub created_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  /// Every selected card, fixed at creation
  pub card_ids: Vec<i64>,
  /// Answered cards in answer order; grows by one per accepted answer
  pub answered_card_ids: Vec<i64>,
  /// Decks the selected cards came from (reporting only)
  pub deck_ids: Vec<i64>,
}

impl QuizSession {
  pub fn state(&self) -> QuizState {
    if self.completed_at.is_some() {
      QuizState::Complete
    } else {
      QuizState::Open
    }
  }

  pub fn is_complete(&self) -> bool {
    self.state() == QuizState::Complete
  }

  /// True when the session was completed by quitting rather than answering
  /// every card.
  pub fn was_abandoned(&self) -> bool {
    self.is_complete() && self.answered_card_ids.len() < self.card_ids.len()
  }

  pub fn unanswered_card_ids(&self) -> Vec<i64> {
    self
      .card_ids
      .iter()
      .copied()
      .filter(|id| !self.answered_card_ids.contains(id))
      .collect()
  }

  /// Pick the next card to present. Presentation order is random and
  /// independent of the stored order.
  pub fn next_card_id<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i64> {
    if self.is_complete() {
      return None;
    }
    let unanswered = self.unanswered_card_ids();
    if unanswered.is_empty() {
      return None;
    }
    Some(unanswered[rng.random_range(0..unanswered.len())])
  }

  /// Check that `card_id` may be answered now, without changing anything.
  pub fn check_answer(&self, card_id: i64) -> Result<(), SessionError> {
    if self.is_complete() {
      return Err(SessionError::AlreadyComplete { quiz_id: self.id });
    }
    if !self.card_ids.contains(&card_id) {
      return Err(SessionError::CardNotInQuiz { quiz_id: self.id, card_id });
    }
    if self.answered_card_ids.contains(&card_id) {
      return Err(SessionError::AlreadyAnswered { quiz_id: self.id, card_id });
    }
    Ok(())
  }

  /// Record an answered card. Completes the session when the last card is
  /// answered.
  pub fn record_answer(&mut self, card_id: i64, now: DateTime<Utc>) -> Result<QuizState, SessionError> {
    self.check_answer(card_id)?;
    self.answered_card_ids.push(card_id);
    if self.answered_card_ids.len() == self.card_ids.len() {
      self.completed_at = Some(now);
    }
    Ok(self.state())
  }

  /// Abandon the session. Unanswered cards stay unanswered.
  pub fn quit(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
    if self.is_complete() {
      return Err(SessionError::AlreadyComplete { quiz_id: self.id });
    }
    self.completed_at = Some(now);
    Ok(())
  }
}

/// A quiz about to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuiz {
  pub account_id: i64,
  pub created_at: DateTime<Utc>,
  pub card_ids: Vec<i64>,
  pub deck_ids: Vec<i64>,
}

/// One answered card in a quiz's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResultItem {
  pub card_id: i64,
  pub short_label: String,
  pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResults {
  pub quiz_id: i64,
  pub items: Vec<QuizResultItem>,
}

impl QuizResults {
  pub fn correct_count(&self) -> usize {
    self.items.iter().filter(|item| item.correct).count()
  }

  pub fn summary(&self) -> String {
    format!("{} out of {} correct", self.correct_count(), self.items.len())
  }
}
