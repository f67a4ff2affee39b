use axum::{
  extract::{Path, State},
  Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{self, CardStats};

use super::{ensure_account, ApiError, AppState};

#[derive(Serialize)]
pub struct CardStatsRow {
  #[serde(flatten)]
  pub stats: CardStats,
  pub score: u32,
}

#[derive(Serialize)]
pub struct StatsResponse {
  pub since: DateTime<Utc>,
  pub cards: Vec<CardStatsRow>,
}

/// Per-card scores over the account's stats history window
pub async fn card_stats(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
) -> Result<Json<StatsResponse>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let conn = db::try_lock(&state.pool)?;

  let settings = db::get_account_settings(&conn, account_id)?;
  let since = Utc::now() - Duration::days(i64::from(settings.stats_history_days()));
  let cards = db::card_performance(&conn, account_id, since)?
    .into_iter()
    .map(|stats| CardStatsRow {
      score: stats.score(),
      stats,
    })
    .collect();

  Ok(Json(StatsResponse { since, cards }))
}
