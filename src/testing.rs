//! Test utilities for database setup.
//!
//! Builds a real database file with the authoritative migrations so tests
//! exercise the same schema as production.

use chrono::{Duration, Utc};
use rusqlite::Connection;
use std::sync::MutexGuard;
use tempfile::TempDir;

use crate::db::{self, DbPool, SqliteStore};
use crate::domain::{AccountDeck, Card, NewAnswer};

/// Test environment with a migrated database in a temporary directory.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub pool: DbPool,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let pool = db::init_db(&temp.path().join("flashcards.db"))?;
        Ok(Self { temp, pool })
    }

    /// Lock the connection. Do not call other helpers while holding it.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        db::try_lock(&self.pool).expect("test database lock")
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone())
    }

    pub fn add_account(&self, name: &str) -> i64 {
        db::insert_account(&self.conn(), name).expect("insert account")
    }

    /// Create a deck with `card_count` cards and associate it with the
    /// account. Returns the deck id and card ids in insertion order.
    pub fn add_deck(&self, account_id: i64, title: &str, included: bool, card_count: usize) -> (i64, Vec<i64>) {
        let conn = self.conn();
        let deck_id = db::insert_deck(&conn, title).expect("insert deck");
        db::upsert_account_deck(&conn, account_id, deck_id, included).expect("associate deck");

        let card_ids = (0..card_count)
            .map(|i| {
                let label = format!("{} {}", title, i + 1);
                let card = Card::new(deck_id, &label, &format!("Prompt for {}", label), &format!("Answer {}", i + 1));
                db::insert_card(&conn, &card).expect("insert card")
            })
            .collect();
        (deck_id, card_ids)
    }

    /// Log an answer made `ago` before now, outside of any quiz
    pub fn add_answer(&self, account_id: i64, card_id: i64, is_correct: bool, ago: Duration) {
        db::insert_answer(
            &self.conn(),
            &NewAnswer {
                account_id,
                quiz_id: 0,
                card_id,
                is_correct,
                answered_at: Utc::now() - ago,
            },
        )
        .expect("insert answer");
    }

    pub fn account_decks(&self, account_id: i64) -> Vec<AccountDeck> {
        db::get_account_decks(&self.conn(), account_id).expect("load account decks")
    }
}
