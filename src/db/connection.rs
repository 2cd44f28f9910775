// src/db/connection.rs
//
// Database connection management
//
// PRINCIPLES:
// - Explicit connection pooling
// - No hidden connection creation
// - Clear error propagation

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Resolve the cache database file path
///
/// `BOOKWHISPERER_DB` overrides the location; otherwise the database lives
/// in the platform data directory: {DATA_DIR}/bookwhisperer/bookwhisperer.db
pub fn database_path() -> AppResult<PathBuf> {
    if let Ok(path) = std::env::var("BOOKWHISPERER_DB") {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::Other("Could not determine app data directory".to_string()))?;

    let app_dir = data_dir.join("bookwhisperer");

    // Ensure directory exists
    std::fs::create_dir_all(&app_dir).map_err(AppError::Io)?;

    Ok(app_dir.join("bookwhisperer.db"))
}

/// Create a connection pool
///
/// Pool configuration:
/// - Small pool; the tool is single-threaded and short-lived
/// - SQLite in WAL mode
/// - Foreign keys enabled
/// - Busy timeout set to avoid immediate errors
pub fn create_connection_pool() -> AppResult<ConnectionPool> {
    let db_path = database_path()?;

    let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| AppError::Other(format!("Failed to create connection pool: {}", e)))?;

    Ok(pool)
}

/// Create an in-memory pool (for testing)
///
/// max_size is 1 so every checkout sees the same in-memory database.
#[cfg(test)]
pub fn create_test_pool() -> AppResult<ConnectionPool> {
    let manager = SqliteConnectionManager::memory().with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| AppError::Other(format!("Failed to create test pool: {}", e)))?;

    Ok(pool)
}
