use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::domain::{AccountDeck, AccountSettings, AnswerRecord, Card, NewAnswer, NewQuiz, QuizSession};
use crate::scheduler::{QuizStore, StoreResult};

use super::{try_lock, DbPool};

/// SQLite-backed store. Each call holds the connection lock only for its own
/// statements.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl QuizStore for SqliteStore {
    fn account_decks(&self, account_id: i64) -> StoreResult<Vec<AccountDeck>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_account_decks(&conn, account_id)?)
    }

    fn merge_mastered_cards(&self, account_id: i64, deck_id: i64, card_ids: &BTreeSet<i64>) -> StoreResult<()> {
        let conn = try_lock(&self.pool)?;
        Ok(super::merge_mastered_cards(&conn, account_id, deck_id, card_ids)?)
    }

    fn cards_for_decks(&self, deck_ids: &[i64]) -> StoreResult<Vec<Card>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_cards_for_decks(&conn, deck_ids)?)
    }

    fn cards_by_ids(&self, card_ids: &[i64]) -> StoreResult<Vec<Card>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_cards_by_ids(&conn, card_ids)?)
    }

    fn recent_answers(&self, account_id: i64, card_ids: &[i64], since: DateTime<Utc>) -> StoreResult<Vec<AnswerRecord>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_recent_answers(&conn, account_id, card_ids, since)?)
    }

    fn answers_for_quiz(&self, account_id: i64, quiz_id: i64) -> StoreResult<Vec<AnswerRecord>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_answers_for_quiz(&conn, account_id, quiz_id)?)
    }

    fn record_answer(&self, answer: &NewAnswer, quiz: &QuizSession) -> StoreResult<AnswerRecord> {
        let conn = try_lock(&self.pool)?;
        Ok(super::record_quiz_answer(&conn, answer, quiz)?)
    }

    fn create_quiz(&self, quiz: &NewQuiz) -> StoreResult<QuizSession> {
        let conn = try_lock(&self.pool)?;
        Ok(super::create_quiz(&conn, quiz)?)
    }

    fn quiz(&self, account_id: i64, quiz_id: i64) -> StoreResult<Option<QuizSession>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_quiz(&conn, account_id, quiz_id)?)
    }

    fn open_quiz(&self, account_id: i64) -> StoreResult<Option<QuizSession>> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_open_quiz(&conn, account_id)?)
    }

    fn update_quiz(&self, quiz: &QuizSession) -> StoreResult<()> {
        let conn = try_lock(&self.pool)?;
        Ok(super::update_quiz(&conn, quiz)?)
    }

    fn account_settings(&self, account_id: i64) -> StoreResult<AccountSettings> {
        let conn = try_lock(&self.pool)?;
        Ok(super::get_account_settings(&conn, account_id)?)
    }
}
