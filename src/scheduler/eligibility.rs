//! Reduce an account's cards to the candidate pool for a quiz.

use std::collections::HashMap;

use crate::domain::{AccountDeck, Card};

/// Outcome of filtering an account's cards.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
  /// No deck is flagged for quizzing; the learner has to pick one first
  NoDecksIncluded,
  /// Cards from included decks, minus deleted and already-mastered cards.
  /// May be empty.
  Pool(Vec<Card>),
}

/// Ids of the decks flagged "included in quizzes".
pub fn included_deck_ids(account_decks: &[AccountDeck]) -> Vec<i64> {
  account_decks
    .iter()
    .filter(|d| d.is_included)
    .map(|d| d.deck_id)
    .collect()
}

/// Build the eligible pool from the account's decks and candidate cards.
pub fn eligible_pool(account_decks: &[AccountDeck], cards: &[Card]) -> Eligibility {
  let included: HashMap<i64, &AccountDeck> = account_decks
    .iter()
    .filter(|d| d.is_included)
    .map(|d| (d.deck_id, d))
    .collect();

  if included.is_empty() {
    return Eligibility::NoDecksIncluded;
  }

  let pool = cards
    .iter()
    .filter(|card| !card.is_deleted())
    .filter(|card| {
      included
        .get(&card.deck_id)
        .is_some_and(|deck| !deck.is_mastered(card.id))
    })
    .cloned()
    .collect();

  Eligibility::Pool(pool)
}
