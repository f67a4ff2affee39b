pub mod accounts;
pub mod answers;
pub mod cards;
pub mod decks;
pub mod quizzes;
pub mod schema;
pub mod stats;
pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export all public items from submodules
pub use accounts::*;
pub use answers::*;
pub use cards::*;
pub use decks::*;
pub use quizzes::*;
pub use schema::run_migrations;
pub use stats::*;
pub use store::SqliteStore;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database unavailable")
    }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
    pool.lock().map_err(|_: PoisonError<_>| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        DbLockError
    })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    // Create backup before migrations if database exists
    if path.exists() {
        let backup_path = path.with_extension("db.backup");
        if let Err(e) = std::fs::copy(path, &backup_path) {
            tracing::warn!("Could not create database backup: {}", e);
        }
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Fixed-width RFC 3339 so that text comparison in SQL is chronological
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp, reporting the column on failure
pub(crate) fn parse_timestamp(column: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub(crate) fn parse_optional_timestamp(column: usize, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(column, &v)).transpose()
}

/// Comma-separated `?` placeholders for an IN clause
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
