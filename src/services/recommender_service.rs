// src/services/recommender_service.rs
//
// Recommendation orchestration
//
// Cycle state machine: ACTIVE (some books unrecommended) → EXHAUSTED (all
// recommended) → ACTIVE again after a clear. A book is never recommended
// twice within one cycle, and never twice within one call.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::Book;
use crate::error::{AppError, AppResult};
use crate::repositories::RecommendationRepository;
use crate::services::similarity::SimilarityEngine;

/// Fuzzy matches below this score are treated as no match.
const FUZZY_MIN_SCORE: f64 = 80.0;

/// Recommendation strategy, selected once at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Content similarity against the reading history profile
    Tfidf,
    /// Free-text query similarity
    Query,
    /// Fuzzy title matching
    Fuzzy,
}

impl FromStr for Method {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tfidf" => Ok(Method::Tfidf),
            "query" => Ok(Method::Query),
            "fuzzy" => Ok(Method::Fuzzy),
            other => Err(AppError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Tfidf => write!(f, "tfidf"),
            Method::Query => write!(f, "query"),
            Method::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// A selected book together with its strategy score
/// (cosine in [0,1] or fuzzy ratio in [0,100], depending on the method).
#[derive(Debug, Clone)]
pub struct ScoredBook {
    pub book: Book,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct RecommendOutcome {
    /// Selected books in rank order, at most `top_n`, no duplicates
    pub picks: Vec<ScoredBook>,
    /// True when the history cycle was exhausted and reset during this call
    pub cycle_reset: bool,
}

pub struct RecommenderService {
    history: Arc<dyn RecommendationRepository>,
}

impl RecommenderService {
    pub fn new(history: Arc<dyn RecommendationRepository>) -> Self {
        Self { history }
    }

    /// Pick the next `top_n` books from `books` with the given strategy.
    ///
    /// Prunes history against the snapshot, resets the cycle on
    /// exhaustion (before ranking, or mid-batch when the last
    /// unrecommended book is selected) and records every pick.
    pub fn recommend(
        &self,
        books: &[Book],
        method: Method,
        query: Option<&str>,
        top_n: usize,
    ) -> AppResult<RecommendOutcome> {
        if top_n < 1 {
            return Err(AppError::InvalidArgument(format!(
                "top must be at least 1, got {}",
                top_n
            )));
        }
        if books.is_empty() {
            return Err(AppError::EmptyCatalog);
        }

        let catalog_ids: BTreeSet<i64> = books.iter().map(|b| b.id).collect();
        self.history.prune(&catalog_ids)?;

        let mut recommended = self.history.all_recommended()?;
        let mut cycle_reset = false;

        if recommended.len() == catalog_ids.len() {
            info!("All {} books recommended, starting a new cycle", books.len());
            self.history.clear()?;
            recommended.clear();
            cycle_reset = true;
        }

        let engine = SimilarityEngine::fit(books);

        let mut picks: Vec<(i64, f64)> = self
            .rank(&engine, method, query, &recommended)?
            .into_iter()
            .take(top_n)
            .collect();

        // Mid-batch exhaustion: the picks above cover every remaining
        // unrecommended book. Reset and keep filling from the full corpus,
        // never repeating an id already picked in this call.
        if picks.len() < top_n && recommended.len() + picks.len() == catalog_ids.len() {
            info!("Cycle exhausted mid-selection, starting a new cycle");
            self.history.clear()?;
            cycle_reset = true;

            let picked_ids: BTreeSet<i64> = picks.iter().map(|&(id, _)| id).collect();
            let remaining = top_n - picks.len();
            picks.extend(
                self.rank(&engine, method, query, &picked_ids)?
                    .into_iter()
                    .take(remaining),
            );
        }

        let now = Utc::now();
        for &(id, _) in &picks {
            self.history.record(id, now)?;
        }

        let by_id: HashMap<i64, &Book> = books.iter().map(|b| (b.id, b)).collect();
        let picks = picks
            .into_iter()
            .map(|(id, score)| ScoredBook {
                book: (*by_id[&id]).clone(),
                score,
            })
            .collect();

        Ok(RecommendOutcome { picks, cycle_reset })
    }

    fn rank(
        &self,
        engine: &SimilarityEngine,
        method: Method,
        query: Option<&str>,
        excluded: &BTreeSet<i64>,
    ) -> AppResult<Vec<(i64, f64)>> {
        match method {
            Method::Tfidf => Ok(engine.rank_content(excluded)),
            Method::Query => {
                let query = query
                    .filter(|q| !q.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::InvalidArgument(
                            "the query method requires a query string".to_string(),
                        )
                    })?;
                Ok(engine.rank_query(query, excluded))
            }
            Method::Fuzzy => {
                let query = query.unwrap_or("");
                let matches: Vec<(i64, f64)> = engine
                    .rank_fuzzy(query, excluded)
                    .into_iter()
                    .filter(|&(_, score)| score >= FUZZY_MIN_SCORE)
                    .collect();

                if matches.is_empty() {
                    warn!(query, "No fuzzy title matches, falling back to query similarity");
                    Ok(engine.rank_query(query, excluded))
                } else {
                    Ok(matches)
                }
            }
        }
    }

    /// Wipe the recommendation history. Idempotent.
    pub fn clear_history(&self) -> AppResult<()> {
        self.history.clear()
    }
}
