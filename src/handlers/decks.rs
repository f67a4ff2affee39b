use axum::{
  extract::{Path, State},
  Json,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::AccountDeck;

use super::{ensure_account, ApiError, AppState};

#[derive(Serialize)]
pub struct DeckSummary {
  pub deck_id: i64,
  pub title: String,
  pub is_included: bool,
  pub mastered_count: usize,
}

impl From<AccountDeck> for DeckSummary {
  fn from(deck: AccountDeck) -> Self {
    Self {
      deck_id: deck.deck_id,
      mastered_count: deck.mastered_card_ids.len(),
      title: deck.title,
      is_included: deck.is_included,
    }
  }
}

#[derive(Deserialize)]
pub struct IncludeRequest {
  pub is_included: bool,
}

pub async fn list_decks(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
) -> Result<Json<Vec<DeckSummary>>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let conn = db::try_lock(&state.pool)?;
  let decks = db::get_account_decks(&conn, account_id)?;
  Ok(Json(decks.into_iter().map(DeckSummary::from).collect()))
}

/// Include or exclude one of the account's decks from generated quizzes
pub async fn set_deck_included(
  State(state): State<AppState>,
  Path((account_id, deck_id)): Path<(i64, i64)>,
  Json(request): Json<IncludeRequest>,
) -> Result<Json<DeckSummary>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let conn = db::try_lock(&state.pool)?;

  let deck = db::get_account_decks(&conn, account_id)?
    .into_iter()
    .find(|deck| deck.deck_id == deck_id)
    .ok_or(ApiError::NotFound("deck not found"))?;

  db::upsert_account_deck(&conn, account_id, deck_id, request.is_included)?;
  Ok(Json(DeckSummary {
    is_included: request.is_included,
    ..DeckSummary::from(deck)
  }))
}
