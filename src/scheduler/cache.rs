//! Merge newly mastered cards into the per-deck mastery cache.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{AccountDeck, Card};

/// Mastered ids that still need to be written for one deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasteryMerge {
  pub account_id: i64,
  pub deck_id: i64,
  /// Ids not yet present in the deck's cache
  pub added: BTreeSet<i64>,
}

/// Work out which decks gain which mastered ids.
///
/// Ids already cached are skipped, so planning against a deck that already
/// holds every id yields nothing. Ids whose card is unknown or whose deck
/// has no account association are dropped.
pub fn plan_mastery_merges(
  account_decks: &[AccountDeck],
  cards: &[Card],
  newly_mastered: &BTreeSet<i64>,
) -> Vec<MasteryMerge> {
  let mut by_deck: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
  for card in cards.iter().filter(|c| newly_mastered.contains(&c.id)) {
    by_deck.entry(card.deck_id).or_default().insert(card.id);
  }

  account_decks
    .iter()
    .filter_map(|deck| {
      let ids = by_deck.get(&deck.deck_id)?;
      let added: BTreeSet<i64> = ids.difference(&deck.mastered_card_ids).copied().collect();
      if added.is_empty() {
        None
      } else {
        Some(MasteryMerge {
          account_id: deck.account_id,
          deck_id: deck.deck_id,
          added,
        })
      }
    })
    .collect()
}
