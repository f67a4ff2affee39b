//! Quiz card selection: unseen cards first, then the worst performers.
//!
//! This module picks the cards for a new quiz from the available pool:
//! - Cards with no recent answer are preferred and sampled uniformly
//! - When unseen cards run out, seen cards fill the rest, lowest success
//!   rate first, longest-neglected first on ties
//! - A small pool yields a short quiz; nothing is padded or repeated

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap};

use crate::domain::{AnswerRecord, Card};

/// Recent performance of one seen card
#[derive(Debug, Clone, PartialEq)]
pub struct CardPerformance {
  pub card_id: i64,
  pub correct_answers: u32,
  pub total_answers: u32,
  /// Earliest recent answer for this card
  pub oldest_answer_at: DateTime<Utc>,
}

impl CardPerformance {
  pub fn success_rate(&self) -> f64 {
    if self.total_answers > 0 {
      f64::from(self.correct_answers) / f64::from(self.total_answers)
    } else {
      0.0
    }
  }
}

/// Cards chosen for a quiz and the decks they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
  pub card_ids: Vec<i64>,
  pub deck_ids: Vec<i64>,
}

impl Selection {
  pub fn is_empty(&self) -> bool {
    self.card_ids.is_empty()
  }
}

/// Summarise recent answers per card. Only cards with at least one answer
/// appear in the result.
pub fn calculate_performance(recent_answers: &[AnswerRecord]) -> HashMap<i64, CardPerformance> {
  let mut performance: HashMap<i64, CardPerformance> = HashMap::new();

  for answer in recent_answers {
    let entry = performance.entry(answer.card_id).or_insert_with(|| CardPerformance {
      card_id: answer.card_id,
      correct_answers: 0,
      total_answers: 0,
      oldest_answer_at: answer.answered_at,
    });
    entry.total_answers += 1;
    if answer.is_correct {
      entry.correct_answers += 1;
    }
    if answer.answered_at < entry.oldest_answer_at {
      entry.oldest_answer_at = answer.answered_at;
    }
  }

  performance
}

/// Order seen cards worst first: ascending success rate, then ascending
/// oldest answer time.
pub fn rank_worst_performers(mut seen: Vec<CardPerformance>) -> Vec<CardPerformance> {
  seen.sort_by(|a, b| {
    a.success_rate()
      .total_cmp(&b.success_rate())
      .then(a.oldest_answer_at.cmp(&b.oldest_answer_at))
      .then(a.card_id.cmp(&b.card_id))
  });
  seen
}

/// Choose up to `question_count` cards from `available`.
pub fn select_quiz_cards<R: Rng + ?Sized>(
  available: &[Card],
  recent_answers: &[AnswerRecord],
  question_count: usize,
  rng: &mut R,
) -> Selection {
  if available.is_empty() || question_count == 0 {
    return Selection::default();
  }

  let performance = calculate_performance(recent_answers);
  let (mut unseen, seen): (Vec<&Card>, Vec<&Card>) =
    available.iter().partition(|card| !performance.contains_key(&card.id));

  let chosen: Vec<&Card> = if unseen.len() >= question_count {
    unseen.shuffle(rng);
    unseen.truncate(question_count);
    unseen
  } else {
    let need = question_count - unseen.len();
    let by_id: HashMap<i64, &Card> = seen.iter().map(|card| (card.id, *card)).collect();
    let ranked = rank_worst_performers(
      seen
        .iter()
        .filter_map(|card| performance.get(&card.id).cloned())
        .collect(),
    );

    tracing::debug!(
      "Selection: {} unseen, {} seen, filling {} from worst performers",
      unseen.len(),
      ranked.len(),
      need.min(ranked.len())
    );

    unseen
      .into_iter()
      .chain(ranked.iter().take(need).filter_map(|perf| by_id.get(&perf.card_id).copied()))
      .collect()
  };

  let deck_ids: BTreeSet<i64> = chosen.iter().map(|card| card.deck_id).collect();
  Selection {
    card_ids: chosen.iter().map(|card| card.id).collect(),
    deck_ids: deck_ids.into_iter().collect(),
  }
}
