use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flashcard. Cards are never rewritten once answered; edits create history
/// only through new answers, and removal is a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
  pub id: i64,
  pub deck_id: i64,
  /// Short label shown in lists and quiz results
  pub short_label: String,
  pub prompt: String,
  pub answer: String,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Card {
  pub fn new(deck_id: i64, short_label: &str, prompt: &str, answer: &str) -> Self {
    Self {
      id: 0,
      deck_id,
      short_label: short_label.to_string(),
      prompt: prompt.to_string(),
      answer: answer.to_string(),
      deleted_at: None,
    }
  }

  pub fn is_deleted(&self) -> bool {
    self.deleted_at.is_some()
  }
}
