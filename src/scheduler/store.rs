//! Storage seam for the scheduler.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::db::DbLockError;
use crate::domain::{AccountDeck, AccountSettings, AnswerRecord, Card, NewAnswer, NewQuiz, QuizSession};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error(transparent)]
  Unavailable(#[from] DbLockError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything the scheduler reads and writes. Every call may fail.
pub trait QuizStore: Send + Sync {
  /// All deck associations for the account, with their mastery caches
  fn account_decks(&self, account_id: i64) -> StoreResult<Vec<AccountDeck>>;

  /// Union `card_ids` into the deck's mastery cache. Never removes entries.
  fn merge_mastered_cards(&self, account_id: i64, deck_id: i64, card_ids: &BTreeSet<i64>) -> StoreResult<()>;

  /// Non-deleted cards belonging to any of `deck_ids`
  fn cards_for_decks(&self, deck_ids: &[i64]) -> StoreResult<Vec<Card>>;

  fn cards_by_ids(&self, card_ids: &[i64]) -> StoreResult<Vec<Card>>;

  /// Answers by the account for `card_ids` recorded at or after `since`
  fn recent_answers(&self, account_id: i64, card_ids: &[i64], since: DateTime<Utc>) -> StoreResult<Vec<AnswerRecord>>;

  fn answers_for_quiz(&self, account_id: i64, quiz_id: i64) -> StoreResult<Vec<AnswerRecord>>;

  /// Append `answer` to the log and save `quiz` with it, atomically
  fn record_answer(&self, answer: &NewAnswer, quiz: &QuizSession) -> StoreResult<AnswerRecord>;

  fn create_quiz(&self, quiz: &NewQuiz) -> StoreResult<QuizSession>;

  fn quiz(&self, account_id: i64, quiz_id: i64) -> StoreResult<Option<QuizSession>>;

  /// The account's Open quiz, if any
  fn open_quiz(&self, account_id: i64) -> StoreResult<Option<QuizSession>>;

  /// Full-row update of a quiz
  fn update_quiz(&self, quiz: &QuizSession) -> StoreResult<()>;

  fn account_settings(&self, account_id: i64) -> StoreResult<AccountSettings>;
}
