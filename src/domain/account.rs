//! Per-account deck associations and validated study settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::config;

/// Per-account view of a deck, including the mastery cache.
///
/// `mastered_card_ids` only ever grows through the mastery cache merge; the
/// scheduler never removes entries from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDeck {
  pub account_id: i64,
  pub deck_id: i64,
  pub title: String,
  /// Whether cards from this deck are drawn into generated quizzes
  pub is_included: bool,
  /// Last card the learner browsed in this deck (UI only)
  pub last_viewed_card_id: Option<i64>,
  pub mastered_card_ids: BTreeSet<i64>,
}

impl AccountDeck {
  pub fn new(account_id: i64, deck_id: i64, title: &str, is_included: bool) -> Self {
    Self {
      account_id,
      deck_id,
      title: title.to_string(),
      is_included,
      last_viewed_card_id: None,
      mastered_card_ids: BTreeSet::new(),
    }
  }

  pub fn is_mastered(&self, card_id: i64) -> bool {
    self.mastered_card_ids.contains(&card_id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
  #[error("{field} must be at least 1")]
  BelowMinimum { field: &'static str },
  #[error("mastery window ({window} days) cannot exceed the review cycle ({cycle} days)")]
  WindowExceedsCycle { window: u32, cycle: u32 },
}

/// Study settings for one account.
///
/// Fields are private so the range invariants hold for every instance:
/// every value is at least 1 and the mastery window never exceeds the
/// review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSettings {
  default_question_count: u32,
  review_cycle_days: u32,
  mastery_streak_count: u32,
  mastery_window_days: u32,
  stats_history_days: u32,
}

impl Default for AccountSettings {
  fn default() -> Self {
    Self {
      default_question_count: config::DEFAULT_QUESTION_COUNT,
      review_cycle_days: config::DEFAULT_REVIEW_CYCLE_DAYS,
      mastery_streak_count: config::DEFAULT_MASTERY_STREAK_COUNT,
      mastery_window_days: config::DEFAULT_MASTERY_WINDOW_DAYS.min(config::DEFAULT_REVIEW_CYCLE_DAYS),
      stats_history_days: config::DEFAULT_STATS_HISTORY_DAYS,
    }
  }
}

fn at_least_one(field: &'static str, value: u32) -> Result<u32, SettingsError> {
  if value == 0 {
    Err(SettingsError::BelowMinimum { field })
  } else {
    Ok(value)
  }
}

impl AccountSettings {
  pub fn new(
    default_question_count: u32,
    review_cycle_days: u32,
    mastery_streak_count: u32,
    mastery_window_days: u32,
    stats_history_days: u32,
  ) -> Result<Self, SettingsError> {
    let review_cycle_days = at_least_one("review_cycle_days", review_cycle_days)?;
    let mastery_window_days = at_least_one("mastery_window_days", mastery_window_days)?;
    if mastery_window_days > review_cycle_days {
      return Err(SettingsError::WindowExceedsCycle {
        window: mastery_window_days,
        cycle: review_cycle_days,
      });
    }

    Ok(Self {
      default_question_count: at_least_one("default_question_count", default_question_count)?,
      review_cycle_days,
      mastery_streak_count: at_least_one("mastery_streak_count", mastery_streak_count)?,
      mastery_window_days,
      stats_history_days: at_least_one("stats_history_days", stats_history_days)?,
    })
  }

  pub fn default_question_count(&self) -> u32 {
    self.default_question_count
  }

  pub fn review_cycle_days(&self) -> u32 {
    self.review_cycle_days
  }

  pub fn mastery_streak_count(&self) -> u32 {
    self.mastery_streak_count
  }

  pub fn mastery_window_days(&self) -> u32 {
    self.mastery_window_days
  }

  pub fn stats_history_days(&self) -> u32 {
    self.stats_history_days
  }

  pub fn set_default_question_count(&mut self, count: u32) -> Result<(), SettingsError> {
    self.default_question_count = at_least_one("default_question_count", count)?;
    Ok(())
  }

  /// Change the review cycle. A mastery window longer than the new cycle is
  /// clamped down to it.
  pub fn set_review_cycle_days(&mut self, days: u32) -> Result<(), SettingsError> {
    self.review_cycle_days = at_least_one("review_cycle_days", days)?;
    if self.mastery_window_days > self.review_cycle_days {
      tracing::debug!(
        "Clamping mastery window from {} to {} days",
        self.mastery_window_days,
        self.review_cycle_days
      );
      self.mastery_window_days = self.review_cycle_days;
    }
    Ok(())
  }

  pub fn set_mastery_streak_count(&mut self, count: u32) -> Result<(), SettingsError> {
    self.mastery_streak_count = at_least_one("mastery_streak_count", count)?;
    Ok(())
  }

  pub fn set_mastery_window_days(&mut self, days: u32) -> Result<(), SettingsError> {
    let days = at_least_one("mastery_window_days", days)?;
    if days > self.review_cycle_days {
      return Err(SettingsError::WindowExceedsCycle {
        window: days,
        cycle: self.review_cycle_days,
      });
    }
    self.mastery_window_days = days;
    Ok(())
  }

  pub fn set_stats_history_days(&mut self, days: u32) -> Result<(), SettingsError> {
    self.stats_history_days = at_least_one("stats_history_days", days)?;
    Ok(())
  }
}

/// Partial settings change, applied field by field. The review cycle is
/// applied before the mastery window so both can move together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
  pub default_question_count: Option<u32>,
  pub review_cycle_days: Option<u32>,
  pub mastery_streak_count: Option<u32>,
  pub mastery_window_days: Option<u32>,
  pub stats_history_days: Option<u32>,
}

impl SettingsUpdate {
  pub fn apply(&self, settings: &AccountSettings) -> Result<AccountSettings, SettingsError> {
    let mut updated = *settings;
    if let Some(count) = self.default_question_count {
      updated.set_default_question_count(count)?;
    }
    if let Some(days) = self.review_cycle_days {
      updated.set_review_cycle_days(days)?;
    }
    if let Some(count) = self.mastery_streak_count {
      updated.set_mastery_streak_count(count)?;
    }
    if let Some(days) = self.mastery_window_days {
      updated.set_mastery_window_days(days)?;
    }
    if let Some(days) = self.stats_history_days {
      updated.set_stats_history_days(days)?;
    }
    Ok(updated)
  }
}
