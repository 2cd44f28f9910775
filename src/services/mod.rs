// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod catalog_service;
pub mod recommender_service;
pub mod similarity;

#[cfg(test)]
mod recommender_service_tests;

// Re-export all services and their types
pub use catalog_service::CatalogService;

pub use recommender_service::{
    Method,
    RecommendOutcome,
    RecommenderService,
    ScoredBook,
};

pub use similarity::{SimilarityEngine, TfidfModel};
