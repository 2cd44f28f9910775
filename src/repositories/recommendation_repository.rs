// src/repositories/recommendation_repository.rs
//
// Recommendation history persistence

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::ConnectionPool;
use crate::domain::Recommendation;
use crate::error::AppResult;

pub trait RecommendationRepository: Send + Sync {
    /// Record a recommendation. Idempotent: recording an already-recorded
    /// book id is a no-op, not an error.
    fn record(&self, book_id: i64, recommended_at: DateTime<Utc>) -> AppResult<()>;
    fn is_recommended(&self, book_id: i64) -> AppResult<bool>;
    /// Set of all book ids recorded in the active cycle.
    fn all_recommended(&self) -> AppResult<BTreeSet<i64>>;
    /// All records, ordered by timestamp then id.
    fn list_all(&self) -> AppResult<Vec<Recommendation>>;
    /// Delete all records, resetting the cycle. Idempotent on an empty store.
    fn clear(&self) -> AppResult<()>;
    /// Remove records whose book id is not in `valid_ids`.
    fn prune(&self, valid_ids: &BTreeSet<i64>) -> AppResult<()>;
}

pub struct SqliteRecommendationRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteRecommendationRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_recommendation(row: &Row) -> Result<Recommendation, rusqlite::Error> {
        let book_id: i64 = row.get("book_id")?;

        let recommended_at_str: String = row.get("recommended_at")?;
        let recommended_at = DateTime::parse_from_rfc3339(&recommended_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(Recommendation {
            book_id,
            recommended_at,
        })
    }
}

impl RecommendationRepository for SqliteRecommendationRepository {
    fn record(&self, book_id: i64, recommended_at: DateTime<Utc>) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT OR IGNORE INTO recommendations (book_id, recommended_at)
             VALUES (?1, ?2)",
            params![book_id, recommended_at.to_rfc3339()],
        )?;

        Ok(())
    }

    fn is_recommended(&self, book_id: i64) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recommendations WHERE book_id = ?1)",
            [book_id],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn all_recommended(&self) -> AppResult<BTreeSet<i64>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT book_id FROM recommendations")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(ids)
    }

    fn list_all(&self) -> AppResult<Vec<Recommendation>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT book_id, recommended_at FROM recommendations
             ORDER BY recommended_at ASC, book_id ASC",
        )?;
        let records = stmt
            .query_map([], Self::row_to_recommendation)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn clear(&self) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute("DELETE FROM recommendations", [])?;

        Ok(())
    }

    fn prune(&self, valid_ids: &BTreeSet<i64>) -> AppResult<()> {
        let conn = self.pool.get()?;

        // Build a parameterized IN clause; history is small
        let placeholders = valid_ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = if valid_ids.is_empty() {
            "DELETE FROM recommendations".to_string()
        } else {
            format!(
                "DELETE FROM recommendations WHERE book_id NOT IN ({})",
                placeholders
            )
        };

        let params = valid_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect::<Vec<_>>();
        conn.execute(&sql, params.as_slice())?;

        Ok(())
    }
}
