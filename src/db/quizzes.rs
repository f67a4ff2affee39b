//! Quiz sessions. Card id lists are stored as JSON arrays.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{AnswerRecord, NewAnswer, NewQuiz, QuizSession};

use super::{format_timestamp, insert_answer, parse_optional_timestamp, parse_timestamp};

const QUIZ_COLUMNS: &str = "id, account_id, created_at, completed_at, card_ids, answered_card_ids, deck_ids";

fn ids_to_json(ids: &[i64]) -> Result<String> {
    serde_json::to_string(ids).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn ids_from_json(column: usize, value: &str) -> Result<Vec<i64>> {
    serde_json::from_str(value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn quiz_from_row(row: &Row) -> Result<QuizSession> {
    let created_at: String = row.get(2)?;
    let card_ids: String = row.get(4)?;
    let answered_card_ids: String = row.get(5)?;
    let deck_ids: String = row.get(6)?;

    Ok(QuizSession {
        id: row.get(0)?,
        account_id: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
        completed_at: parse_optional_timestamp(3, row.get(3)?)?,
        card_ids: ids_from_json(4, &card_ids)?,
        answered_card_ids: ids_from_json(5, &answered_card_ids)?,
        deck_ids: ids_from_json(6, &deck_ids)?,
    })
}

pub fn create_quiz(conn: &Connection, quiz: &NewQuiz) -> Result<QuizSession> {
    conn.execute(
        r#"
    INSERT INTO quizzes (account_id, created_at, card_ids, answered_card_ids, deck_ids)
    VALUES (?1, ?2, ?3, '[]', ?4)
    "#,
        params![
            quiz.account_id,
            format_timestamp(&quiz.created_at),
            ids_to_json(&quiz.card_ids)?,
            ids_to_json(&quiz.deck_ids)?,
        ],
    )?;

    Ok(QuizSession {
        id: conn.last_insert_rowid(),
        account_id: quiz.account_id,
        created_at: quiz.created_at,
        completed_at: None,
        card_ids: quiz.card_ids.clone(),
        answered_card_ids: vec![],
        deck_ids: quiz.deck_ids.clone(),
    })
}

pub fn get_quiz(conn: &Connection, account_id: i64, quiz_id: i64) -> Result<Option<QuizSession>> {
    conn.query_row(
        &format!("SELECT {} FROM quizzes WHERE id = ?1 AND account_id = ?2", QUIZ_COLUMNS),
        params![quiz_id, account_id],
        quiz_from_row,
    )
    .optional()
}

/// The most recent quiz that is neither finished nor quit
pub fn get_open_quiz(conn: &Connection, account_id: i64) -> Result<Option<QuizSession>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM quizzes WHERE account_id = ?1 AND completed_at IS NULL ORDER BY id DESC LIMIT 1",
            QUIZ_COLUMNS
        ),
        params![account_id],
        quiz_from_row,
    )
    .optional()
}

/// Persist progress and completion of a session. Fails with
/// `QueryReturnedNoRows` when the quiz does not exist.
pub fn update_quiz(conn: &Connection, quiz: &QuizSession) -> Result<()> {
    let updated = conn.execute(
        r#"
    UPDATE quizzes
    SET completed_at = ?1, answered_card_ids = ?2
    WHERE id = ?3 AND account_id = ?4
    "#,
        params![
            quiz.completed_at.as_ref().map(format_timestamp),
            ids_to_json(&quiz.answered_card_ids)?,
            quiz.id,
            quiz.account_id,
        ],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

/// Log an answer and save the session that accepted it, in one transaction.
/// Either both are written or neither is.
pub fn record_quiz_answer(conn: &Connection, answer: &NewAnswer, quiz: &QuizSession) -> Result<AnswerRecord> {
    let tx = conn.unchecked_transaction()?;
    let record = insert_answer(&tx, answer)?;
    update_quiz(&tx, quiz)?;
    tx.commit()?;
    Ok(record)
}

/// All quizzes of an account, newest first
pub fn get_quizzes_for_account(conn: &Connection, account_id: i64) -> Result<Vec<QuizSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM quizzes WHERE account_id = ?1 ORDER BY id DESC",
        QUIZ_COLUMNS
    ))?;
    let quizzes = stmt
        .query_map(params![account_id], quiz_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(quizzes)
}
