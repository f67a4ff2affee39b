use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One answer in the account's answer log.
///
/// `id` is the unique key (a database sequence); `answered_at` is the
/// chronological key. Ordering never relies on `id` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
  pub id: i64,
  pub account_id: i64,
  pub quiz_id: i64,
  pub card_id: i64,
  pub is_correct: bool,
  pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
  /// Chronological order: by timestamp, then by id for answers recorded
  /// within the same clock tick.
  pub fn chronological(a: &Self, b: &Self) -> Ordering {
    a.answered_at.cmp(&b.answered_at).then(a.id.cmp(&b.id))
  }
}

/// An answer about to be written to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
  pub account_id: i64,
  pub quiz_id: i64,
  pub card_id: i64,
  pub is_correct: bool,
  pub answered_at: DateTime<Utc>,
}
