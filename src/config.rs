//! Application configuration constants.
//!
//! Centralizes the database location, server address and the default study
//! settings given to accounts that never changed them.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== File Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    port: Option<u16>,
}

fn read_config_file() -> Option<AppConfig> {
    let contents = std::fs::read_to_string("config.toml").ok()?;
    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed config.toml: {}", e);
            None
        }
    }
}

// ==================== Database Configuration ====================

/// Default database location when nothing else is configured
pub const DEFAULT_DB_PATH: &str = "data/flashcards.db";

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Priority 1: config.toml
    if let Some(path) = read_config_file()
        .and_then(|c| c.database)
        .and_then(|db| db.path)
    {
        tracing::info!("Using database from config.toml: {}", path);
        return PathBuf::from(path);
    }

    // Priority 2: .env DATABASE_PATH
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        return PathBuf::from(path);
    }

    let default = PathBuf::from(DEFAULT_DB_PATH);
    tracing::info!("Using default database path: {}", default.display());
    default
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Port from config.toml, falling back to SERVER_PORT
pub fn server_port() -> u16 {
    read_config_file()
        .and_then(|c| c.server)
        .and_then(|s| s.port)
        .unwrap_or(SERVER_PORT)
}

/// Get the full server bind address
pub fn server_bind_addr() -> String {
    format!("{}:{}", SERVER_ADDR, server_port())
}

// ==================== Study Defaults ====================

/// Questions per generated quiz
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Days of answer history that count as recent for scheduling
pub const DEFAULT_REVIEW_CYCLE_DAYS: u32 = 21;

/// Consecutive correct answers needed for mastery
pub const DEFAULT_MASTERY_STREAK_COUNT: u32 = 3;

/// Longest span the mastery streak may cover (clamped to the review cycle)
pub const DEFAULT_MASTERY_WINDOW_DAYS: u32 = 21;

/// Days of answer history shown in per-card statistics
pub const DEFAULT_STATS_HISTORY_DAYS: u32 = 90;
