// src/integrations/calibre/client.rs
//
// Calibre Content Server API integration
//
// ARCHITECTURE:
// - Thin JSON client for the Calibre content server's /ajax endpoints
// - Maps external data → RemoteBook DTOs (NO domain mutation)
// - Used by CatalogService
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Never creates or modifies domain entities directly
// - Returns DTOs that services can map
// - Handles all external API concerns

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Book metadata as reported by the catalog server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBook {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub topics: Vec<String>,
}

/// Response of GET /ajax/search
#[derive(Debug, Deserialize)]
struct SearchResponse {
    book_ids: Option<Vec<i64>>,
}

/// Response of GET /ajax/book/{id}/{library}
#[derive(Debug, Deserialize)]
struct BookResponse {
    title: Option<String>,
    authors: Option<Vec<String>>,
    tags: Option<Vec<String>>,
}

/// Abstraction over the remote catalog, so services can be tested without
/// a live server.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogSource: Send + Sync {
    /// Current id list of the remote catalog, in server order.
    fn fetch_ids(&self) -> AppResult<Vec<i64>>;
    /// Metadata for the given ids. Ids whose fetch fails are skipped;
    /// the map contains only the books that could be loaded.
    fn fetch_books(&self, ids: &[i64]) -> AppResult<HashMap<i64, RemoteBook>>;
}

pub struct CalibreClient {
    http: Client,
    base_url: String,
    library: String,
    user: String,
    password: String,
}

impl CalibreClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.calibre_url.trim_end_matches('/').to_string(),
            library: config.calibre_library.clone(),
            user: config.calibre_user.clone(),
            password: config.calibre_pass.clone(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::Auth(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )))
            }
            status if !status.is_success() => {
                return Err(AppError::Network(format!("{} returned {}", url, status)))
            }
            _ => {}
        }

        Ok(response.json::<T>()?)
    }
}

impl CatalogSource for CalibreClient {
    fn fetch_ids(&self) -> AppResult<Vec<i64>> {
        let url = format!("{}/ajax/search", self.base_url);
        let query = [
            ("library_id", self.library.clone()),
            ("pattern", String::new()),
            ("start", "0".to_string()),
            ("num", "10000".to_string()),
        ];

        let response: SearchResponse = self.get_json(&url, &query)?;
        Ok(response.book_ids.unwrap_or_default())
    }

    fn fetch_books(&self, ids: &[i64]) -> AppResult<HashMap<i64, RemoteBook>> {
        let mut books = HashMap::with_capacity(ids.len());

        for &id in ids {
            let url = format!("{}/ajax/book/{}/{}", self.base_url, id, self.library);
            match self.get_json::<BookResponse>(&url, &[]) {
                Ok(info) => {
                    books.insert(
                        id,
                        RemoteBook {
                            id,
                            title: info.title.unwrap_or_else(|| format!("Book {}", id)),
                            author: info.authors.unwrap_or_default().join(", "),
                            topics: info.tags.unwrap_or_default(),
                        },
                    );
                }
                // Auth failures are systemic; per-book failures are not
                Err(err @ AppError::Auth(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(book_id = id, error = %err, "Failed loading book details, skipping");
                }
            }
        }

        if books.is_empty() && !ids.is_empty() {
            return Err(AppError::Network(
                "Could not load metadata for any book".to_string(),
            ));
        }

        Ok(books)
    }
}
