use axum::{
  extract::{Path, State},
  Json,
};

use crate::db;
use crate::domain::{AccountSettings, SettingsUpdate};

use super::{ensure_account, ApiError, AppState};

pub async fn get_settings(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
) -> Result<Json<AccountSettings>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let conn = db::try_lock(&state.pool)?;
  Ok(Json(db::get_account_settings(&conn, account_id)?))
}

/// Apply a partial update. Nothing is saved if any field is invalid.
pub async fn update_settings(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
  Json(update): Json<SettingsUpdate>,
) -> Result<Json<AccountSettings>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let conn = db::try_lock(&state.pool)?;

  let current = db::get_account_settings(&conn, account_id)?;
  let updated = update.apply(&current)?;
  db::save_account_settings(&conn, account_id, &updated)?;

  tracing::info!("Updated settings for account {}", account_id);
  Ok(Json(updated))
}
