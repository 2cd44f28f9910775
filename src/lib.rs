// src/lib.rs
// BookWhisperer - Local-first book recommender for a Calibre library
//
// Architecture:
// - Domain-centric: entities and invariants live in `domain`
// - Explicit: No implicit behavior, no magic
// - Local-first: the catalog is cached in SQLite, the recommendation
//   history is durable across runs
// - Synchronous: one run = one refresh, one ranking, one set of writes

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod integrations;
pub mod repositories;
pub mod services;

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{validate_book, Book, Recommendation};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    BookRepository,
    RecommendationRepository,
    SqliteBookRepository,
    SqliteRecommendationRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    CatalogService,
    Method,
    RecommendOutcome,
    RecommenderService,
    ScoredBook,
    SimilarityEngine,
};

// ============================================================================
// PUBLIC API - Integrations
// ============================================================================

pub use integrations::{CalibreClient, CatalogSource};
