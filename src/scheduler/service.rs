//! Quiz orchestration: runs the pure scheduling steps against a store.
//!
//! Generation for one account is serialized by a per-account async mutex,
//! because the mastery cache merge is a read-modify-write. Different
//! accounts never wait on each other.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::db::LogOnError;
use crate::domain::{
  AccountDeck, AccountSettings, AnswerRecord, Card, NewAnswer, NewQuiz, QuizResultItem, QuizResults,
  QuizSession, QuizState, SessionError,
};

use super::cache::plan_mastery_merges;
use super::eligibility::{eligible_pool, included_deck_ids, Eligibility};
use super::mastery::{detect_newly_mastered, review_cutoff, MasteryPolicy};
use super::selection::select_quiz_cards;
use super::store::{QuizStore, StoreError};

#[derive(Debug, Error)]
pub enum QuizError {
  #[error(transparent)]
  Storage(#[from] StoreError),
  #[error(transparent)]
  Session(#[from] SessionError),
  #[error("quiz {quiz_id} not found for account {account_id}")]
  QuizNotFound { account_id: i64, quiz_id: i64 },
  #[error("question count must be at least 1")]
  InvalidQuestionCount,
}

/// Result of a quiz request. Only `Created` carries a session; the other two
/// are normal conditions the learner can act on.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
  Created(QuizSession),
  /// No deck is included in quizzes
  NoDecksSelected,
  /// Included decks have nothing left that is not mastered
  NothingToReview,
}

impl QuizOutcome {
  pub fn message(&self) -> Option<&'static str> {
    match self {
      Self::Created(_) => None,
      Self::NoDecksSelected => Some("Please select at least one deck for quiz by checking the checkbox."),
      Self::NothingToReview => Some("No cards available for quiz in selected decks."),
    }
  }
}

/// One async mutex per account, created on first use.
#[derive(Debug, Default)]
pub struct AccountLocks {
  locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl AccountLocks {
  pub async fn acquire(&self, account_id: i64) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      Arc::clone(locks.entry(account_id).or_default())
    };
    lock.lock_owned().await
  }
}

/// Pool, answers and mastery decisions from one evaluation pass.
enum Evaluation {
  NoDecksIncluded,
  Evaluated {
    pool: Vec<Card>,
    recent_answers: Vec<AnswerRecord>,
    newly_mastered: BTreeSet<i64>,
  },
}

pub struct QuizService<S> {
  store: S,
  locks: AccountLocks,
}

impl<S: QuizStore> QuizService<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      locks: AccountLocks::default(),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Generate a quiz for the account. Uses the account's default question
  /// count when `question_count` is `None`.
  pub async fn generate_quiz(&self, account_id: i64, question_count: Option<u32>) -> Result<QuizOutcome, QuizError> {
    let _guard = self.locks.acquire(account_id).await;
    self.generate_locked(account_id, question_count, Utc::now(), &mut rand::rng())
  }

  /// Abandon the account's open quiz, if any, then generate a new one.
  pub async fn start_new_quiz(&self, account_id: i64, question_count: Option<u32>) -> Result<QuizOutcome, QuizError> {
    let _guard = self.locks.acquire(account_id).await;
    let now = Utc::now();

    if let Some(mut open) = self.store.open_quiz(account_id)? {
      open.quit(now)?;
      self.store.update_quiz(&open)?;
      tracing::info!("Abandoned open quiz {} for account {}", open.id, account_id);
    }

    self.generate_locked(account_id, question_count, now, &mut rand::rng())
  }

  /// Record an answer for `card_id` and return the updated session.
  ///
  /// The stored session is re-read under the account lock, so a stale copy
  /// cannot answer a card twice.
  pub async fn submit_answer(&self, session: QuizSession, card_id: i64, correct: bool) -> Result<QuizSession, QuizError> {
    let _guard = self.locks.acquire(session.account_id).await;
    let now = Utc::now();
    let mut session = self.load_quiz(session.account_id, session.id)?;

    let state = session.record_answer(card_id, now)?;
    self.store.record_answer(
      &NewAnswer {
        account_id: session.account_id,
        quiz_id: session.id,
        card_id,
        is_correct: correct,
        answered_at: now,
      },
      &session,
    )?;

    if state == QuizState::Complete {
      tracing::info!("Quiz {} complete for account {}", session.id, session.account_id);
      self.refresh_mastery_locked(session.account_id, now);
    }
    Ok(session)
  }

  /// Abandon an open session.
  pub async fn quit(&self, session: QuizSession) -> Result<QuizSession, QuizError> {
    let _guard = self.locks.acquire(session.account_id).await;
    let now = Utc::now();
    let mut session = self.load_quiz(session.account_id, session.id)?;

    session.quit(now)?;
    self.store.update_quiz(&session)?;
    tracing::info!(
      "Quiz {} quit by account {} after {} of {} cards",
      session.id,
      session.account_id,
      session.answered_card_ids.len(),
      session.card_ids.len()
    );

    self.refresh_mastery_locked(session.account_id, now);
    Ok(session)
  }

  /// The account's open quiz, for resuming.
  pub fn current_quiz(&self, account_id: i64) -> Result<Option<QuizSession>, QuizError> {
    Ok(self.store.open_quiz(account_id)?)
  }

  /// A random unanswered card of the session, or `None` once it is complete.
  pub fn next_card<R: Rng + ?Sized>(&self, session: &QuizSession, rng: &mut R) -> Result<Option<Card>, QuizError> {
    let Some(card_id) = session.next_card_id(rng) else {
      return Ok(None);
    };
    Ok(self.store.cards_by_ids(&[card_id])?.into_iter().next())
  }

  pub fn load_quiz(&self, account_id: i64, quiz_id: i64) -> Result<QuizSession, QuizError> {
    self
      .store
      .quiz(account_id, quiz_id)?
      .ok_or(QuizError::QuizNotFound { account_id, quiz_id })
  }

  /// Answered cards of a quiz with their correctness, in answer order.
  pub fn quiz_results(&self, account_id: i64, quiz_id: i64) -> Result<QuizResults, QuizError> {
    let quiz = self.load_quiz(account_id, quiz_id)?;
    let mut answers = self.store.answers_for_quiz(account_id, quiz.id)?;
    answers.sort_by(AnswerRecord::chronological);

    let card_ids: Vec<i64> = answers.iter().map(|a| a.card_id).collect();
    let labels: HashMap<i64, String> = self
      .store
      .cards_by_ids(&card_ids)?
      .into_iter()
      .map(|card| (card.id, card.short_label))
      .collect();

    let items = answers
      .iter()
      .map(|answer| QuizResultItem {
        card_id: answer.card_id,
        short_label: labels.get(&answer.card_id).cloned().unwrap_or_default(),
        correct: answer.is_correct,
      })
      .collect();

    Ok(QuizResults { quiz_id: quiz.id, items })
  }

  fn generate_locked<R: Rng + ?Sized>(
    &self,
    account_id: i64,
    question_count: Option<u32>,
    now: DateTime<Utc>,
    rng: &mut R,
  ) -> Result<QuizOutcome, QuizError> {
    let settings = self.store.account_settings(account_id)?;
    let question_count = match question_count {
      Some(0) => return Err(QuizError::InvalidQuestionCount),
      Some(count) => count,
      None => settings.default_question_count(),
    };

    let (pool, recent_answers, newly_mastered) = match self.evaluate(account_id, &settings, now)? {
      Evaluation::NoDecksIncluded => {
        tracing::info!("Account {} has no deck selected for quizzes", account_id);
        return Ok(QuizOutcome::NoDecksSelected);
      }
      Evaluation::Evaluated {
        pool,
        recent_answers,
        newly_mastered,
      } => (pool, recent_answers, newly_mastered),
    };

    let available: Vec<Card> = pool
      .into_iter()
      .filter(|card| !newly_mastered.contains(&card.id))
      .collect();

    let selection = select_quiz_cards(&available, &recent_answers, question_count as usize, rng);
    if selection.is_empty() {
      tracing::info!("Account {} has nothing left to review", account_id);
      return Ok(QuizOutcome::NothingToReview);
    }

    let quiz = self.store.create_quiz(&NewQuiz {
      account_id,
      created_at: now,
      card_ids: selection.card_ids,
      deck_ids: selection.deck_ids,
    })?;

    tracing::info!(
      "Created quiz {} for account {} with {} cards from {} available",
      quiz.id,
      account_id,
      quiz.card_ids.len(),
      available.len()
    );
    Ok(QuizOutcome::Created(quiz))
  }

  /// Eligibility, mastery detection and cache sync, in that order.
  fn evaluate(&self, account_id: i64, settings: &AccountSettings, now: DateTime<Utc>) -> Result<Evaluation, QuizError> {
    let account_decks = self.store.account_decks(account_id)?;
    let deck_ids = included_deck_ids(&account_decks);
    if deck_ids.is_empty() {
      return Ok(Evaluation::NoDecksIncluded);
    }

    let cards = self.store.cards_for_decks(&deck_ids)?;
    let pool = match eligible_pool(&account_decks, &cards) {
      Eligibility::NoDecksIncluded => return Ok(Evaluation::NoDecksIncluded),
      Eligibility::Pool(pool) => pool,
    };

    if pool.is_empty() {
      return Ok(Evaluation::Evaluated {
        pool,
        recent_answers: vec![],
        newly_mastered: BTreeSet::new(),
      });
    }

    let pool_ids: Vec<i64> = pool.iter().map(|card| card.id).collect();
    let recent_answers = self
      .store
      .recent_answers(account_id, &pool_ids, review_cutoff(now, settings))?;
    let newly_mastered = detect_newly_mastered(&pool, &recent_answers, MasteryPolicy::from_settings(settings));

    self.persist_mastery(&account_decks, &pool, &newly_mastered);

    Ok(Evaluation::Evaluated {
      pool,
      recent_answers,
      newly_mastered,
    })
  }

  /// Best effort: a failed write only means the card may show up in one
  /// more quiz before the next merge succeeds.
  fn persist_mastery(&self, account_decks: &[AccountDeck], pool: &[Card], newly_mastered: &BTreeSet<i64>) {
    for merge in plan_mastery_merges(account_decks, pool, newly_mastered) {
      let persisted = self
        .store
        .merge_mastered_cards(merge.account_id, merge.deck_id, &merge.added)
        .log_warn("Failed to persist mastered cards");
      if persisted.is_some() {
        tracing::info!(
          "Deck {} for account {}: {} cards newly mastered",
          merge.deck_id,
          merge.account_id,
          merge.added.len()
        );
      }
    }
  }

  fn refresh_mastery_locked(&self, account_id: i64, now: DateTime<Utc>) {
    let refreshed = self
      .store
      .account_settings(account_id)
      .map_err(QuizError::from)
      .and_then(|settings| self.evaluate(account_id, &settings, now));
    refreshed.log_warn("Mastery refresh after quiz completion failed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{self, DbLockError, SqliteStore};
  use crate::testing::TestEnv;
  use chrono::Duration;
  use std::collections::HashSet;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::time::Duration as StdDuration;

  fn service(env: &TestEnv) -> QuizService<SqliteStore> {
    QuizService::new(env.store())
  }

  fn created(outcome: QuizOutcome) -> QuizSession {
    match outcome {
      QuizOutcome::Created(quiz) => quiz,
      other => panic!("expected a quiz, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_no_deck_selected() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", false, 3);

    let outcome = service(&env).generate_quiz(account, None).await.unwrap();
    assert_eq!(outcome, QuizOutcome::NoDecksSelected);
    assert!(outcome.message().is_some());
  }

  #[tokio::test]
  async fn test_small_deck_not_padded() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, card_ids) = env.add_deck(account, "Spanish", true, 4);

    let quiz = created(service(&env).generate_quiz(account, Some(10)).await.unwrap());
    let selected: HashSet<i64> = quiz.card_ids.iter().copied().collect();
    assert_eq!(quiz.card_ids.len(), 4);
    assert_eq!(selected, card_ids.into_iter().collect());
    assert!(quiz.answered_card_ids.is_empty());
    assert_eq!(quiz.state(), QuizState::Open);
  }

  #[tokio::test]
  async fn test_default_question_count_used() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 30);

    let quiz = created(service(&env).generate_quiz(account, None).await.unwrap());
    assert_eq!(quiz.card_ids.len(), 10);
  }

  #[tokio::test]
  async fn test_zero_question_count_rejected() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 3);

    let err = service(&env).generate_quiz(account, Some(0)).await.unwrap_err();
    assert!(matches!(err, QuizError::InvalidQuestionCount));
  }

  #[tokio::test]
  async fn test_only_included_decks_used() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (included, included_cards) = env.add_deck(account, "Spanish", true, 3);
    env.add_deck(account, "French", false, 3);

    let quiz = created(service(&env).generate_quiz(account, Some(10)).await.unwrap());
    assert!(quiz.card_ids.iter().all(|id| included_cards.contains(id)));
    assert_eq!(quiz.deck_ids, vec![included]);
  }

  #[tokio::test]
  async fn test_mastered_card_promoted_and_excluded() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (deck, cards) = env.add_deck(account, "Spanish", true, 3);
    for days_ago in [4, 2, 0] {
      env.add_answer(account, cards[0], true, Duration::days(days_ago));
    }

    let quiz = created(service(&env).generate_quiz(account, Some(10)).await.unwrap());
    assert!(!quiz.card_ids.contains(&cards[0]));
    assert_eq!(quiz.card_ids.len(), 2);

    let decks = env.account_decks(account);
    let cached = decks.iter().find(|d| d.deck_id == deck).unwrap();
    assert!(cached.mastered_card_ids.contains(&cards[0]));
  }

  #[tokio::test]
  async fn test_everything_mastered_reports_nothing_to_review() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, cards) = env.add_deck(account, "Spanish", true, 2);
    for card_id in &cards {
      for days_ago in [3, 2, 1] {
        env.add_answer(account, *card_id, true, Duration::days(days_ago));
      }
    }

    let service = service(&env);
    assert_eq!(service.generate_quiz(account, None).await.unwrap(), QuizOutcome::NothingToReview);
    // Cache is now populated, so the second request stops at eligibility
    assert_eq!(service.generate_quiz(account, None).await.unwrap(), QuizOutcome::NothingToReview);
    assert_eq!(env.account_decks(account)[0].mastered_card_ids.len(), 2);
  }

  #[tokio::test]
  async fn test_answers_outside_review_cycle_ignored() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, cards) = env.add_deck(account, "Spanish", true, 1);
    // A perfect streak, but older than the 21-day review cycle
    for days_ago in [30, 29, 28] {
      env.add_answer(account, cards[0], true, Duration::days(days_ago));
    }

    let quiz = created(service(&env).generate_quiz(account, None).await.unwrap());
    assert_eq!(quiz.card_ids, cards);
    assert!(env.account_decks(account)[0].mastered_card_ids.is_empty());
  }

  #[tokio::test]
  async fn test_submit_until_complete() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 3);
    let service = service(&env);

    let mut quiz = created(service.generate_quiz(account, None).await.unwrap());
    let card_ids = quiz.card_ids.clone();
    for (i, card_id) in card_ids.iter().enumerate() {
      quiz = service.submit_answer(quiz, *card_id, i % 2 == 0).await.unwrap();
    }

    assert!(quiz.is_complete());
    assert!(quiz.completed_at.is_some());
    assert_eq!(quiz.answered_card_ids, card_ids);

    let stored = service.load_quiz(account, quiz.id).unwrap();
    assert_eq!(stored, quiz);

    let results = service.quiz_results(account, quiz.id).unwrap();
    assert_eq!(results.items.len(), 3);
    assert_eq!(results.correct_count(), 2);
  }

  #[tokio::test]
  async fn test_submit_rejects_foreign_card_without_logging() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 2);
    let service = service(&env);

    let quiz = created(service.generate_quiz(account, None).await.unwrap());
    let err = service.submit_answer(quiz.clone(), 9999, true).await.unwrap_err();
    assert!(matches!(err, QuizError::Session(SessionError::CardNotInQuiz { .. })));
    assert!(service.quiz_results(account, quiz.id).unwrap().items.is_empty());
  }

  #[tokio::test]
  async fn test_next_card_is_unanswered() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 2);
    let service = service(&env);
    let mut rng = rand::rng();

    let quiz = created(service.generate_quiz(account, None).await.unwrap());
    let first = quiz.card_ids[0];
    let quiz = service.submit_answer(quiz, first, false).await.unwrap();

    let next = service.next_card(&quiz, &mut rng).unwrap().unwrap();
    assert_eq!(next.id, quiz.card_ids[1]);

    let quiz = service.submit_answer(quiz, next.id, true).await.unwrap();
    assert!(service.next_card(&quiz, &mut rng).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_quit_half_answered() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 4);
    let service = service(&env);

    let quiz = created(service.generate_quiz(account, None).await.unwrap());
    let first = quiz.card_ids[0];
    let quiz = service.submit_answer(quiz, first, true).await.unwrap();
    let quiz = service.quit(quiz).await.unwrap();

    assert!(quiz.is_complete());
    assert!(quiz.was_abandoned());
    assert_eq!(quiz.answered_card_ids, vec![first]);
    assert!(service.current_quiz(account).unwrap().is_none());

    let err = service.quit(quiz).await.unwrap_err();
    assert!(matches!(err, QuizError::Session(SessionError::AlreadyComplete { .. })));
  }

  #[tokio::test]
  async fn test_start_new_quiz_abandons_open_one() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 4);
    let service = service(&env);

    let first = created(service.generate_quiz(account, None).await.unwrap());
    assert_eq!(service.current_quiz(account).unwrap().map(|q| q.id), Some(first.id));

    let second = created(service.start_new_quiz(account, None).await.unwrap());
    assert_ne!(first.id, second.id);
    assert!(service.load_quiz(account, first.id).unwrap().is_complete());
    assert_eq!(service.current_quiz(account).unwrap().map(|q| q.id), Some(second.id));
  }

  #[tokio::test]
  async fn test_completion_refreshes_mastery() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, cards) = env.add_deck(account, "Spanish", true, 1);
    env.add_answer(account, cards[0], true, Duration::days(2));
    env.add_answer(account, cards[0], true, Duration::days(1));
    let service = service(&env);

    let quiz = created(service.generate_quiz(account, None).await.unwrap());
    assert!(env.account_decks(account)[0].mastered_card_ids.is_empty());

    // Third correct answer completes both the quiz and the streak
    service.submit_answer(quiz, cards[0], true).await.unwrap();
    assert!(env.account_decks(account)[0].mastered_card_ids.contains(&cards[0]));
  }

  #[tokio::test]
  async fn test_quiz_not_found() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let err = service(&env).load_quiz(account, 42).unwrap_err();
    assert!(matches!(err, QuizError::QuizNotFound { quiz_id: 42, .. }));
  }

  #[tokio::test]
  async fn test_accounts_are_independent() {
    let env = TestEnv::new().unwrap();
    let alice = env.add_account("alice");
    let bob = env.add_account("bob");
    env.add_deck(alice, "Spanish", true, 5);
    env.add_deck(bob, "French", true, 5);
    let service = Arc::new(service(&env));

    let (a, b) = tokio::join!(service.generate_quiz(alice, None), service.generate_quiz(bob, None));
    assert_eq!(created(a.unwrap()).account_id, alice);
    assert_eq!(created(b.unwrap()).account_id, bob);
  }

  /// Delegates to SQLite, with injected failures and a slow deck read that
  /// counts overlapping generations.
  #[derive(Default)]
  struct Faults {
    fail_create_quiz: bool,
    fail_record_answer_once: AtomicBool,
    deck_read_delay: Option<StdDuration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
  }

  struct FaultyStore {
    inner: SqliteStore,
    faults: Arc<Faults>,
  }

  impl FaultyStore {
    fn new(inner: SqliteStore, faults: &Arc<Faults>) -> Self {
      Self {
        inner,
        faults: Arc::clone(faults),
      }
    }
  }

  impl QuizStore for FaultyStore {
    fn account_decks(&self, account_id: i64) -> Result<Vec<AccountDeck>, StoreError> {
      if let Some(delay) = self.faults.deck_read_delay {
        let now_running = self.faults.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.faults.peak_in_flight.fetch_max(now_running, Ordering::SeqCst);
        std::thread::sleep(delay);
        self.faults.in_flight.fetch_sub(1, Ordering::SeqCst);
      }
      self.inner.account_decks(account_id)
    }
    fn merge_mastered_cards(&self, account_id: i64, deck_id: i64, card_ids: &BTreeSet<i64>) -> Result<(), StoreError> {
      self.inner.merge_mastered_cards(account_id, deck_id, card_ids)
    }
    fn cards_for_decks(&self, deck_ids: &[i64]) -> Result<Vec<Card>, StoreError> {
      self.inner.cards_for_decks(deck_ids)
    }
    fn cards_by_ids(&self, card_ids: &[i64]) -> Result<Vec<Card>, StoreError> {
      self.inner.cards_by_ids(card_ids)
    }
    fn recent_answers(&self, account_id: i64, card_ids: &[i64], since: DateTime<Utc>) -> Result<Vec<AnswerRecord>, StoreError> {
      self.inner.recent_answers(account_id, card_ids, since)
    }
    fn answers_for_quiz(&self, account_id: i64, quiz_id: i64) -> Result<Vec<AnswerRecord>, StoreError> {
      self.inner.answers_for_quiz(account_id, quiz_id)
    }
    fn record_answer(&self, answer: &NewAnswer, quiz: &QuizSession) -> Result<AnswerRecord, StoreError> {
      if self.faults.fail_record_answer_once.swap(false, Ordering::SeqCst) {
        return Err(StoreError::Unavailable(DbLockError));
      }
      self.inner.record_answer(answer, quiz)
    }
    fn create_quiz(&self, quiz: &NewQuiz) -> Result<QuizSession, StoreError> {
      if self.faults.fail_create_quiz {
        return Err(StoreError::Unavailable(DbLockError));
      }
      self.inner.create_quiz(quiz)
    }
    fn quiz(&self, account_id: i64, quiz_id: i64) -> Result<Option<QuizSession>, StoreError> {
      self.inner.quiz(account_id, quiz_id)
    }
    fn open_quiz(&self, account_id: i64) -> Result<Option<QuizSession>, StoreError> {
      self.inner.open_quiz(account_id)
    }
    fn update_quiz(&self, quiz: &QuizSession) -> Result<(), StoreError> {
      self.inner.update_quiz(quiz)
    }
    fn account_settings(&self, account_id: i64) -> Result<AccountSettings, StoreError> {
      self.inner.account_settings(account_id)
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_requests_for_same_account_serialize() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, cards) = env.add_deck(account, "Spanish", true, 3);
    for days_ago in [3, 2, 1] {
      env.add_answer(account, cards[0], true, Duration::days(days_ago));
    }
    let faults = Arc::new(Faults {
      deck_read_delay: Some(StdDuration::from_millis(50)),
      ..Default::default()
    });
    let service = Arc::new(QuizService::new(FaultyStore::new(env.store(), &faults)));

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.generate_quiz(account, None).await })
      })
      .collect();
    for handle in handles {
      let quiz = created(handle.await.unwrap().unwrap());
      assert!(!quiz.card_ids.contains(&cards[0]));
    }

    assert_eq!(faults.peak_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(env.account_decks(account)[0].mastered_card_ids.len(), 1);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_different_accounts_generate_in_parallel() {
    let env = TestEnv::new().unwrap();
    let alice = env.add_account("alice");
    let bob = env.add_account("bob");
    env.add_deck(alice, "Spanish", true, 3);
    env.add_deck(bob, "French", true, 3);
    let faults = Arc::new(Faults {
      deck_read_delay: Some(StdDuration::from_millis(300)),
      ..Default::default()
    });
    let service = Arc::new(QuizService::new(FaultyStore::new(env.store(), &faults)));

    let handles: Vec<_> = [alice, bob]
      .into_iter()
      .map(|account| {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.generate_quiz(account, None).await })
      })
      .collect();
    for handle in handles {
      created(handle.await.unwrap().unwrap());
    }

    assert_eq!(faults.peak_in_flight.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failed_quiz_insert_keeps_mastery_promotion() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    let (_, cards) = env.add_deck(account, "Spanish", true, 3);
    for days_ago in [3, 2, 1] {
      env.add_answer(account, cards[1], true, Duration::days(days_ago));
    }

    let faults = Arc::new(Faults {
      fail_create_quiz: true,
      ..Default::default()
    });
    let service = QuizService::new(FaultyStore::new(env.store(), &faults));
    let err = service.generate_quiz(account, None).await.unwrap_err();
    assert!(matches!(err, QuizError::Storage(_)));

    assert!(env.account_decks(account)[0].mastered_card_ids.contains(&cards[1]));
    let conn = db::try_lock(&env.pool).unwrap();
    assert!(db::get_quizzes_for_account(&conn, account).unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_failed_answer_write_leaves_no_trace_and_retry_logs_once() {
    let env = TestEnv::new().unwrap();
    let account = env.add_account("sam");
    env.add_deck(account, "Spanish", true, 2);
    let faults = Arc::new(Faults::default());
    let service = QuizService::new(FaultyStore::new(env.store(), &faults));

    let quiz = created(service.generate_quiz(account, None).await.unwrap());
    let card_id = quiz.card_ids[0];

    faults.fail_record_answer_once.store(true, Ordering::SeqCst);
    let err = service.submit_answer(quiz.clone(), card_id, true).await.unwrap_err();
    assert!(matches!(err, QuizError::Storage(_)));
    assert!(service.load_quiz(account, quiz.id).unwrap().answered_card_ids.is_empty());
    assert!(service.quiz_results(account, quiz.id).unwrap().items.is_empty());

    let quiz = service.submit_answer(quiz, card_id, true).await.unwrap();
    assert_eq!(quiz.answered_card_ids, vec![card_id]);

    let err = service.submit_answer(quiz.clone(), card_id, true).await.unwrap_err();
    assert!(matches!(err, QuizError::Session(SessionError::AlreadyAnswered { .. })));

    let conn = db::try_lock(&env.pool).unwrap();
    let logged = db::get_answers_for_quiz(&conn, account, quiz.id).unwrap();
    assert_eq!(logged.iter().filter(|a| a.card_id == card_id).count(), 1);
  }
}
