//! JSON API over the quiz service.

pub mod decks;
pub mod quiz;
pub mod settings;
pub mod stats;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post, put},
  Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::db::{self, DbLockError, DbPool, SqliteStore};
use crate::domain::SettingsError;
use crate::scheduler::{QuizError, QuizService, StoreError};

#[derive(Clone)]
pub struct AppState {
  pub pool: DbPool,
  pub quizzes: Arc<QuizService<SqliteStore>>,
}

impl AppState {
  pub fn new(pool: DbPool) -> Self {
    Self {
      quizzes: Arc::new(QuizService::new(SqliteStore::new(pool.clone()))),
      pool,
    }
  }
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Quiz(#[from] QuizError),
  #[error(transparent)]
  Settings(#[from] SettingsError),
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),
  #[error(transparent)]
  Unavailable(#[from] DbLockError),
  #[error("account {0} not found")]
  AccountNotFound(i64),
  #[error("{0}")]
  NotFound(&'static str),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::Quiz(QuizError::Session(_)) => StatusCode::CONFLICT,
      Self::Quiz(QuizError::QuizNotFound { .. }) | Self::AccountNotFound(_) | Self::NotFound(_) => {
        StatusCode::NOT_FOUND
      }
      Self::Quiz(QuizError::InvalidQuestionCount) | Self::Settings(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Quiz(QuizError::Storage(_)) | Self::Database(_) | Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    Self::Quiz(QuizError::Storage(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
      tracing::error!("Request failed: {}", self);
    } else {
      tracing::debug!("Request rejected ({}): {}", status, self);
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

/// 404 unless the account exists
pub(crate) fn ensure_account(pool: &DbPool, account_id: i64) -> Result<(), ApiError> {
  let conn = db::try_lock(pool)?;
  if db::account_exists(&conn, account_id)? {
    Ok(())
  } else {
    Err(ApiError::AccountNotFound(account_id))
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/api/accounts/{account_id}/quizzes", post(quiz::start_quiz))
    .route("/api/accounts/{account_id}/quizzes/current", get(quiz::current_quiz))
    .route("/api/accounts/{account_id}/quizzes/{quiz_id}/answers", post(quiz::submit_answer))
    .route("/api/accounts/{account_id}/quizzes/{quiz_id}/quit", post(quiz::quit_quiz))
    .route("/api/accounts/{account_id}/quizzes/{quiz_id}/results", get(quiz::quiz_results))
    .route(
      "/api/accounts/{account_id}/settings",
      get(settings::get_settings).put(settings::update_settings),
    )
    .route("/api/accounts/{account_id}/decks", get(decks::list_decks))
    .route("/api/accounts/{account_id}/decks/{deck_id}", put(decks::set_deck_included))
    .route("/api/accounts/{account_id}/stats", get(stats::card_stats))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

pub use decks::{list_decks, set_deck_included};
pub use quiz::{current_quiz, quit_quiz, quiz_results, start_quiz, submit_answer};
pub use settings::{get_settings, update_settings};
pub use stats::card_stats;
