//! Decks, per-account deck associations and the mastery cache

use chrono::Utc;
use rusqlite::{params, Connection, Result};
use std::collections::{BTreeSet, HashMap};

use crate::domain::AccountDeck;

use super::format_timestamp;

pub fn insert_deck(conn: &Connection, title: &str) -> Result<i64> {
    conn.execute("INSERT INTO decks (title) VALUES (?1)", params![title])?;
    Ok(conn.last_insert_rowid())
}

pub fn soft_delete_deck(conn: &Connection, deck_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE decks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![format_timestamp(&Utc::now()), deck_id],
    )?;
    Ok(())
}

/// Create or update an account's association with a deck. The mastery cache
/// is left untouched.
pub fn upsert_account_deck(conn: &Connection, account_id: i64, deck_id: i64, is_included: bool) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO account_decks (account_id, deck_id, is_included)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(account_id, deck_id) DO UPDATE SET is_included = excluded.is_included
    "#,
        params![account_id, deck_id, is_included],
    )?;
    Ok(())
}

pub fn set_last_viewed_card(conn: &Connection, account_id: i64, deck_id: i64, card_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE account_decks SET last_viewed_card_id = ?1 WHERE account_id = ?2 AND deck_id = ?3",
        params![card_id, account_id, deck_id],
    )?;
    Ok(())
}

/// All of an account's decks that are not deleted, with their mastery caches
pub fn get_account_decks(conn: &Connection, account_id: i64) -> Result<Vec<AccountDeck>> {
    let mut mastered = get_mastered_by_deck(conn, account_id)?;

    let mut stmt = conn.prepare(
        r#"
    SELECT ad.account_id, ad.deck_id, d.title, ad.is_included, ad.last_viewed_card_id
    FROM account_decks ad
    JOIN decks d ON d.id = ad.deck_id
    WHERE ad.account_id = ?1 AND d.deleted_at IS NULL
    ORDER BY d.title ASC
    "#,
    )?;

    let decks = stmt
        .query_map(params![account_id], |row| {
            Ok(AccountDeck {
                account_id: row.get(0)?,
                deck_id: row.get(1)?,
                title: row.get(2)?,
                is_included: row.get(3)?,
                last_viewed_card_id: row.get(4)?,
                mastered_card_ids: BTreeSet::new(),
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(decks
        .into_iter()
        .map(|mut deck| {
            deck.mastered_card_ids = mastered.remove(&deck.deck_id).unwrap_or_default();
            deck
        })
        .collect())
}

fn get_mastered_by_deck(conn: &Connection, account_id: i64) -> Result<HashMap<i64, BTreeSet<i64>>> {
    let mut stmt = conn.prepare("SELECT deck_id, card_id FROM mastered_cards WHERE account_id = ?1")?;
    let rows = stmt
        .query_map(params![account_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>>>()?;

    let mut by_deck: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    for (deck_id, card_id) in rows {
        by_deck.entry(deck_id).or_default().insert(card_id);
    }
    Ok(by_deck)
}

/// Union card ids into a deck's mastery cache. Existing entries are kept and
/// duplicates are ignored, so repeating a merge changes nothing.
pub fn merge_mastered_cards(conn: &Connection, account_id: i64, deck_id: i64, card_ids: &BTreeSet<i64>) -> Result<()> {
    let now = format_timestamp(&Utc::now());
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO mastered_cards (account_id, deck_id, card_id, mastered_at) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for card_id in card_ids {
            stmt.execute(params![account_id, deck_id, card_id, now])?;
        }
    }
    tx.commit()
}
