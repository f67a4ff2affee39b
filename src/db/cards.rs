use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Result, Row};

use crate::domain::Card;

use super::{format_timestamp, parse_optional_timestamp, placeholders};

const CARD_COLUMNS: &str = "id, deck_id, short_label, prompt, answer, deleted_at";

fn card_from_row(row: &Row) -> Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        short_label: row.get(2)?,
        prompt: row.get(3)?,
        answer: row.get(4)?,
        deleted_at: parse_optional_timestamp(5, row.get(5)?)?,
    })
}

pub fn insert_card(conn: &Connection, card: &Card) -> Result<i64> {
    conn.execute(
        "INSERT INTO cards (deck_id, short_label, prompt, answer) VALUES (?1, ?2, ?3, ?4)",
        params![card.deck_id, card.short_label, card.prompt, card.answer],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Soft delete: the row stays so that answer history keeps its label
pub fn soft_delete_card(conn: &Connection, card_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE cards SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![format_timestamp(&Utc::now()), card_id],
    )?;
    Ok(())
}

/// Non-deleted cards of the given decks
pub fn get_cards_for_decks(conn: &Connection, deck_ids: &[i64]) -> Result<Vec<Card>> {
    if deck_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT {} FROM cards WHERE deleted_at IS NULL AND deck_id IN ({}) ORDER BY id",
        CARD_COLUMNS,
        placeholders(deck_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map(params_from_iter(deck_ids.iter()), card_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// Cards by id, deleted ones included
pub fn get_cards_by_ids(conn: &Connection, card_ids: &[i64]) -> Result<Vec<Card>> {
    if card_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT {} FROM cards WHERE id IN ({}) ORDER BY id",
        CARD_COLUMNS,
        placeholders(card_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map(params_from_iter(card_ids.iter()), card_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}
