// src/repositories/book_repository.rs
//
// Catalog cache persistence

use std::collections::BTreeSet;
use std::sync::Arc;

use rusqlite::{params, Row};

use crate::db::ConnectionPool;
use crate::domain::Book;
use crate::error::AppResult;

pub trait BookRepository: Send + Sync {
    /// Replace the whole cached snapshot with `books`.
    /// Overwrites rows whose id already exists, drops rows not present.
    fn replace_all(&self, books: &[Book]) -> AppResult<()>;
    /// All cached books, ordered by ascending id.
    fn list_all(&self) -> AppResult<Vec<Book>>;
    /// Set of cached book ids.
    fn ids(&self) -> AppResult<BTreeSet<i64>>;
    fn count(&self) -> AppResult<usize>;
}

pub struct SqliteBookRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteBookRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Map database row to Book - returns rusqlite::Error for query_map compatibility
    fn row_to_book(row: &Row) -> Result<Book, rusqlite::Error> {
        let id: i64 = row.get("id")?;
        let title: String = row.get("title")?;
        let author: String = row.get("author")?;

        let topics_json: String = row.get("topics")?;
        let topics: Vec<String> = serde_json::from_str(&topics_json)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(Book {
            id,
            title,
            author,
            topics,
        })
    }
}

impl BookRepository for SqliteBookRepository {
    fn replace_all(&self, books: &[Book]) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM books", [])?;
        for book in books {
            let topics_json = serde_json::to_string(&book.topics)?;
            tx.execute(
                "INSERT OR REPLACE INTO books (id, title, author, topics)
                 VALUES (?1, ?2, ?3, ?4)",
                params![book.id, book.title, book.author, topics_json],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_all(&self) -> AppResult<Vec<Book>> {
        let conn = self.pool.get()?;

        let mut stmt =
            conn.prepare("SELECT id, title, author, topics FROM books ORDER BY id ASC")?;
        let books = stmt
            .query_map([], Self::row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(books)
    }

    fn ids(&self) -> AppResult<BTreeSet<i64>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT id FROM books")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(ids)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
