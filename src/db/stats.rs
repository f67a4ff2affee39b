//! Per-card answer statistics for the stats page

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use serde::Serialize;

use super::format_timestamp;

/// Answer totals for one card over the stats window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardStats {
    pub card_id: i64,
    pub deck_id: i64,
    pub deck_title: String,
    pub short_label: String,
    pub correct: u32,
    pub total: u32,
    pub is_mastered: bool,
}

impl CardStats {
    /// Percentage of correct answers, rounded to the nearest whole number
    pub fn score(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.correct as f64 * 100.0 / self.total as f64).round() as u32
    }
}

/// Stats for every card the account answered since `since`, limited to
/// non-deleted cards in decks the account still has.
pub fn card_performance(conn: &Connection, account_id: i64, since: DateTime<Utc>) -> Result<Vec<CardStats>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT c.id, c.deck_id, d.title, c.short_label,
           SUM(CASE WHEN a.is_correct THEN 1 ELSE 0 END) AS correct,
           COUNT(*) AS total,
           EXISTS (
             SELECT 1 FROM mastered_cards m
             WHERE m.account_id = a.account_id AND m.deck_id = c.deck_id AND m.card_id = c.id
           ) AS is_mastered
    FROM answers a
    JOIN cards c ON c.id = a.card_id
    JOIN decks d ON d.id = c.deck_id
    JOIN account_decks ad ON ad.account_id = a.account_id AND ad.deck_id = c.deck_id
    WHERE a.account_id = ?1
      AND a.answered_at >= ?2
      AND c.deleted_at IS NULL
      AND d.deleted_at IS NULL
    GROUP BY c.id
    ORDER BY d.title ASC, c.short_label ASC
    "#,
    )?;

    let stats = stmt
        .query_map(params![account_id, format_timestamp(&since)], |row| {
            Ok(CardStats {
                card_id: row.get(0)?,
                deck_id: row.get(1)?,
                deck_title: row.get(2)?,
                short_label: row.get(3)?,
                correct: row.get(4)?,
                total: row.get(5)?,
                is_mastered: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(stats)
}
