//! Mastery detection over the recent answer log.
//!
//! A card is newly mastered when its most recent `streak` answers are all
//! correct and span no more than the mastery window. Only the newest
//! `streak` answers are examined, so a longer run of correct answers never
//! stretches the window.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::{AccountSettings, AnswerRecord, Card};

/// The mastery rule extracted from account settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryPolicy {
  pub streak_count: u32,
  pub window_days: u32,
}

impl MasteryPolicy {
  pub fn from_settings(settings: &AccountSettings) -> Self {
    Self {
      streak_count: settings.mastery_streak_count(),
      window_days: settings.mastery_window_days(),
    }
  }

  fn window(&self) -> Duration {
    Duration::days(i64::from(self.window_days))
  }
}

/// Earliest answer time that still counts as recent.
pub fn review_cutoff(now: DateTime<Utc>, settings: &AccountSettings) -> DateTime<Utc> {
  now - Duration::days(i64::from(settings.review_cycle_days()))
}

/// Group answers by card, newest first.
fn answers_by_card_newest_first<'a>(
  answers: &'a [AnswerRecord],
  card_ids: &HashSet<i64>,
) -> HashMap<i64, Vec<&'a AnswerRecord>> {
  let mut grouped: HashMap<i64, Vec<&AnswerRecord>> = HashMap::new();
  for answer in answers.iter().filter(|a| card_ids.contains(&a.card_id)) {
    grouped.entry(answer.card_id).or_default().push(answer);
  }
  for card_answers in grouped.values_mut() {
    card_answers.sort_by(|a, b| AnswerRecord::chronological(b, a));
  }
  grouped
}

/// Whether a single card's answers (newest first) meet the policy.
fn meets_policy(newest_first: &[&AnswerRecord], policy: MasteryPolicy) -> bool {
  let streak = policy.streak_count as usize;
  if streak == 0 || newest_first.len() < streak {
    return false;
  }

  let run = &newest_first[..streak];
  if !run.iter().all(|a| a.is_correct) {
    return false;
  }

  let newest = run[0].answered_at;
  let oldest = run[streak - 1].answered_at;
  newest - oldest <= policy.window()
}

/// Detect which cards of `pool` have newly reached mastery.
///
/// `recent_answers` should already be restricted to the review cycle;
/// answers for cards outside the pool are ignored. The result depends only
/// on the inputs, not on their order.
pub fn detect_newly_mastered(
  pool: &[Card],
  recent_answers: &[AnswerRecord],
  policy: MasteryPolicy,
) -> BTreeSet<i64> {
  let card_ids: HashSet<i64> = pool.iter().map(|c| c.id).collect();

  let mastered: BTreeSet<i64> = answers_by_card_newest_first(recent_answers, &card_ids)
    .into_iter()
    .filter(|(_, answers)| meets_policy(answers, policy))
    .map(|(card_id, _)| card_id)
    .collect();

  tracing::debug!(
    "Mastery check: {} cards, {} answers, {} newly mastered",
    pool.len(),
    recent_answers.len(),
    mastered.len()
  );
  mastered
}
