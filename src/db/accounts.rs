//! Accounts and their study settings

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::AccountSettings;

use super::format_timestamp;

pub fn insert_account(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, created_at) VALUES (?1, ?2)",
        params![name, format_timestamp(&Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn account_exists(conn: &Connection, account_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM accounts WHERE id = ?1",
        params![account_id],
        |row| row.get(0),
    )
}

/// Settings for an account. Accounts that never saved settings get the
/// defaults.
pub fn get_account_settings(conn: &Connection, account_id: i64) -> Result<AccountSettings> {
    let stored = conn
        .query_row(
            r#"
    SELECT default_question_count, review_cycle_days, mastery_streak_count,
           mastery_window_days, stats_history_days
    FROM account_settings WHERE account_id = ?1
    "#,
            params![account_id],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            },
        )
        .optional()?;

    match stored {
        Some((count, cycle, streak, window, stats)) => AccountSettings::new(count, cycle, streak, window, stats)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e))),
        None => Ok(AccountSettings::default()),
    }
}

pub fn save_account_settings(conn: &Connection, account_id: i64, settings: &AccountSettings) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO account_settings (account_id, default_question_count, review_cycle_days,
                                  mastery_streak_count, mastery_window_days, stats_history_days)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(account_id) DO UPDATE SET
      default_question_count = excluded.default_question_count,
      review_cycle_days = excluded.review_cycle_days,
      mastery_streak_count = excluded.mastery_streak_count,
      mastery_window_days = excluded.mastery_window_days,
      stats_history_days = excluded.stats_history_days
    "#,
        params![
            account_id,
            settings.default_question_count(),
            settings.review_cycle_days(),
            settings.mastery_streak_count(),
            settings.mastery_window_days(),
            settings.stats_history_days(),
        ],
    )?;
    Ok(())
}
