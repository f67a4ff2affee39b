use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL UNIQUE,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS account_settings (
      account_id INTEGER PRIMARY KEY,
      default_question_count INTEGER NOT NULL,
      review_cycle_days INTEGER NOT NULL,
      mastery_streak_count INTEGER NOT NULL,
      mastery_window_days INTEGER NOT NULL,
      stats_history_days INTEGER NOT NULL DEFAULT 90,
      FOREIGN KEY (account_id) REFERENCES accounts(id)
    );

    CREATE TABLE IF NOT EXISTS decks (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      title TEXT NOT NULL,
      deleted_at TEXT
    );

    CREATE TABLE IF NOT EXISTS cards (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      deck_id INTEGER NOT NULL,
      short_label TEXT NOT NULL,
      prompt TEXT NOT NULL,
      answer TEXT NOT NULL,
      deleted_at TEXT,
      FOREIGN KEY (deck_id) REFERENCES decks(id)
    );

    CREATE TABLE IF NOT EXISTS account_decks (
      account_id INTEGER NOT NULL,
      deck_id INTEGER NOT NULL,
      is_included INTEGER NOT NULL DEFAULT 0,
      last_viewed_card_id INTEGER,
      PRIMARY KEY (account_id, deck_id),
      FOREIGN KEY (account_id) REFERENCES accounts(id),
      FOREIGN KEY (deck_id) REFERENCES decks(id)
    );

    -- Mastery cache: rows are only ever inserted by the scheduler
    CREATE TABLE IF NOT EXISTS mastered_cards (
      account_id INTEGER NOT NULL,
      deck_id INTEGER NOT NULL,
      card_id INTEGER NOT NULL,
      mastered_at TEXT NOT NULL,
      PRIMARY KEY (account_id, deck_id, card_id)
    );

    CREATE TABLE IF NOT EXISTS answers (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      account_id INTEGER NOT NULL,
      quiz_id INTEGER NOT NULL,
      card_id INTEGER NOT NULL,
      is_correct INTEGER NOT NULL,
      answered_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS quizzes (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      account_id INTEGER NOT NULL,
      created_at TEXT NOT NULL,
      completed_at TEXT,
      card_ids TEXT NOT NULL,
      answered_card_ids TEXT NOT NULL DEFAULT '[]',
      deck_ids TEXT NOT NULL DEFAULT '[]',
      FOREIGN KEY (account_id) REFERENCES accounts(id)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_cards_deck_id ON cards(deck_id);
    CREATE INDEX IF NOT EXISTS idx_account_decks_account ON account_decks(account_id);
    CREATE INDEX IF NOT EXISTS idx_answers_account_card ON answers(account_id, card_id, answered_at);
    CREATE INDEX IF NOT EXISTS idx_answers_account_quiz ON answers(account_id, quiz_id);
    CREATE INDEX IF NOT EXISTS idx_quizzes_account ON quizzes(account_id, completed_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: stats history setting added after the first release
  add_column_if_missing(conn, "account_settings", "stats_history_days", "INTEGER NOT NULL DEFAULT 90")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
