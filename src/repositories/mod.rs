// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invariant enforcement
// - NO cross-repository calls
// - Explicit SQL only

pub mod book_repository;
pub mod recommendation_repository;

pub use book_repository::{BookRepository, SqliteBookRepository};
pub use recommendation_repository::{RecommendationRepository, SqliteRecommendationRepository};
