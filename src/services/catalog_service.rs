// src/services/catalog_service.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{validate_book, Book};
use crate::error::{AppError, AppResult};
use crate::integrations::{CatalogSource, RemoteBook};
use crate::repositories::BookRepository;

/// Keeps the local catalog snapshot in sync with the remote server.
///
/// Metadata is re-fetched only when the remote id set differs from the
/// cached one; an unreachable server falls back to the stale cache when
/// one exists.
pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
    books: Arc<dyn BookRepository>,
}

impl CatalogService {
    pub fn new(source: Arc<dyn CatalogSource>, books: Arc<dyn BookRepository>) -> Self {
        Self { source, books }
    }

    /// Current snapshot, ordered by ascending book id.
    pub fn refresh(&self) -> AppResult<Vec<Book>> {
        match self.refresh_from_remote() {
            Ok(books) => Ok(books),
            Err(AppError::Network(reason)) | Err(AppError::Auth(reason)) => {
                let cached = self.books.list_all()?;
                if cached.is_empty() {
                    warn!(%reason, "Catalog server unreachable and no local cache exists");
                    Err(AppError::NoCatalogAvailable)
                } else {
                    warn!(
                        %reason,
                        cached = cached.len(),
                        "Catalog server unreachable, using stale cache"
                    );
                    Ok(cached)
                }
            }
            Err(err) => Err(err),
        }
    }

    fn refresh_from_remote(&self) -> AppResult<Vec<Book>> {
        let remote_ids = self.source.fetch_ids()?;
        let remote_set: BTreeSet<i64> = remote_ids.iter().copied().collect();

        if remote_set == self.books.ids()? {
            debug!(books = remote_ids.len(), "Remote id set unchanged, cache hit");
            return self.books.list_all();
        }

        info!(books = remote_ids.len(), "Catalog changed, refreshing cache");
        let fetched = self.source.fetch_books(&remote_ids)?;

        let mut books: Vec<Book> = Vec::with_capacity(fetched.len());
        for id in &remote_ids {
            let Some(remote) = fetched.get(id) else {
                continue;
            };
            let book = Self::to_domain(remote);
            match validate_book(&book) {
                Ok(()) => books.push(book),
                Err(err) => {
                    warn!(book_id = *id, error = %err, "Skipping invalid remote book")
                }
            }
        }

        self.books.replace_all(&books)?;
        self.books.list_all()
    }

    fn to_domain(remote: &RemoteBook) -> Book {
        Book::new(
            remote.id,
            remote.title.clone(),
            remote.author.clone(),
            remote.topics.clone(),
        )
    }
}
