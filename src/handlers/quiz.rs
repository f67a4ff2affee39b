use axum::{
  extract::{Path, State},
  Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::{Card, QuizResultItem, QuizSession};
use crate::scheduler::QuizOutcome;

use super::{ensure_account, ApiError, AppState};

/// Card shown to the learner. The answer is included because grading is
/// done by the learner after flipping the card.
#[derive(Serialize)]
pub struct CardView {
  pub id: i64,
  pub short_label: String,
  pub prompt: String,
  pub answer: String,
}

impl From<Card> for CardView {
  fn from(card: Card) -> Self {
    Self {
      id: card.id,
      short_label: card.short_label,
      prompt: card.prompt,
      answer: card.answer,
    }
  }
}

#[derive(Serialize)]
pub struct QuizView {
  #[serde(flatten)]
  pub quiz: QuizSession,
  pub state: &'static str,
  pub next_card: Option<CardView>,
}

#[derive(Serialize)]
pub struct StartQuizResponse {
  pub status: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quiz: Option<QuizView>,
}

#[derive(Deserialize)]
pub struct StartQuizRequest {
  #[serde(default)]
  pub question_count: Option<u32>,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
  pub card_id: i64,
  pub correct: bool,
}

#[derive(Serialize)]
pub struct ResultsResponse {
  pub quiz_id: i64,
  pub items: Vec<QuizResultItem>,
  pub correct: usize,
  pub answered: usize,
  pub summary: String,
}

fn quiz_view(state: &AppState, quiz: QuizSession) -> Result<QuizView, ApiError> {
  let next_card = state.quizzes.next_card(&quiz, &mut rand::rng())?.map(CardView::from);
  Ok(QuizView {
    state: if quiz.is_complete() { "complete" } else { "open" },
    quiz,
    next_card,
  })
}

/// Start a new quiz, abandoning the open one if there is one. Without a body
/// the account's default question count is used.
pub async fn start_quiz(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
  request: Option<Json<StartQuizRequest>>,
) -> Result<Json<StartQuizResponse>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let question_count = request.and_then(|Json(request)| request.question_count);
  let outcome = state.quizzes.start_new_quiz(account_id, question_count).await?;

  let message = outcome.message();
  let response = match outcome {
    QuizOutcome::Created(quiz) => StartQuizResponse {
      status: "created",
      message,
      quiz: Some(quiz_view(&state, quiz)?),
    },
    QuizOutcome::NoDecksSelected => StartQuizResponse {
      status: "no_decks_selected",
      message,
      quiz: None,
    },
    QuizOutcome::NothingToReview => StartQuizResponse {
      status: "nothing_to_review",
      message,
      quiz: None,
    },
  };
  Ok(Json(response))
}

pub async fn current_quiz(
  State(state): State<AppState>,
  Path(account_id): Path<i64>,
) -> Result<Json<QuizView>, ApiError> {
  ensure_account(&state.pool, account_id)?;
  let quiz = state
    .quizzes
    .current_quiz(account_id)?
    .ok_or(ApiError::NotFound("no quiz in progress"))?;
  Ok(Json(quiz_view(&state, quiz)?))
}

pub async fn submit_answer(
  State(state): State<AppState>,
  Path((account_id, quiz_id)): Path<(i64, i64)>,
  Json(answer): Json<AnswerRequest>,
) -> Result<Json<QuizView>, ApiError> {
  let quiz = state.quizzes.load_quiz(account_id, quiz_id)?;
  let quiz = state.quizzes.submit_answer(quiz, answer.card_id, answer.correct).await?;
  Ok(Json(quiz_view(&state, quiz)?))
}

pub async fn quit_quiz(
  State(state): State<AppState>,
  Path((account_id, quiz_id)): Path<(i64, i64)>,
) -> Result<Json<QuizView>, ApiError> {
  let quiz = state.quizzes.load_quiz(account_id, quiz_id)?;
  let quiz = state.quizzes.quit(quiz).await?;
  Ok(Json(quiz_view(&state, quiz)?))
}

pub async fn quiz_results(
  State(state): State<AppState>,
  Path((account_id, quiz_id)): Path<(i64, i64)>,
) -> Result<Json<ResultsResponse>, ApiError> {
  let results = state.quizzes.quiz_results(account_id, quiz_id)?;
  Ok(Json(ResultsResponse {
    quiz_id: results.quiz_id,
    correct: results.correct_count(),
    answered: results.items.len(),
    summary: results.summary(),
    items: results.items,
  }))
}
