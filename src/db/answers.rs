//! The append-only answer log

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, Result, Row};

use crate::domain::{AnswerRecord, NewAnswer};

use super::{format_timestamp, parse_timestamp, placeholders};

fn answer_from_row(row: &Row) -> Result<AnswerRecord> {
    let answered_at: String = row.get(5)?;
    Ok(AnswerRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        quiz_id: row.get(2)?,
        card_id: row.get(3)?,
        is_correct: row.get(4)?,
        answered_at: parse_timestamp(5, &answered_at)?,
    })
}

pub fn insert_answer(conn: &Connection, answer: &NewAnswer) -> Result<AnswerRecord> {
    conn.execute(
        r#"
    INSERT INTO answers (account_id, quiz_id, card_id, is_correct, answered_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
        params![
            answer.account_id,
            answer.quiz_id,
            answer.card_id,
            answer.is_correct,
            format_timestamp(&answer.answered_at),
        ],
    )?;

    Ok(AnswerRecord {
        id: conn.last_insert_rowid(),
        account_id: answer.account_id,
        quiz_id: answer.quiz_id,
        card_id: answer.card_id,
        is_correct: answer.is_correct,
        answered_at: answer.answered_at,
    })
}

/// Answers to the given cards at or after `since`, oldest first
pub fn get_recent_answers(
    conn: &Connection,
    account_id: i64,
    card_ids: &[i64],
    since: DateTime<Utc>,
) -> Result<Vec<AnswerRecord>> {
    if card_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        r#"
    SELECT id, account_id, quiz_id, card_id, is_correct, answered_at
    FROM answers
    WHERE account_id = ? AND answered_at >= ? AND card_id IN ({})
    ORDER BY answered_at ASC, id ASC
    "#,
        placeholders(card_ids.len())
    );

    let mut values: Vec<Value> = vec![Value::Integer(account_id), Value::Text(format_timestamp(&since))];
    values.extend(card_ids.iter().map(|id| Value::Integer(*id)));

    let mut stmt = conn.prepare(&sql)?;
    let answers = stmt
        .query_map(params_from_iter(values), answer_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(answers)
}

/// Answers recorded during one quiz, oldest first
pub fn get_answers_for_quiz(conn: &Connection, account_id: i64, quiz_id: i64) -> Result<Vec<AnswerRecord>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, account_id, quiz_id, card_id, is_correct, answered_at
    FROM answers
    WHERE account_id = ?1 AND quiz_id = ?2
    ORDER BY answered_at ASC, id ASC
    "#,
    )?;
    let answers = stmt
        .query_map(params![account_id, quiz_id], answer_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(answers)
}
