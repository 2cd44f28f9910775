// src/services/recommender_service_tests.rs
//
// UNIT TESTS: Recommendation cycle
//
// PURPOSE:
// - Prove the no-repeat-within-a-cycle guarantee
// - Prove exhaustion resets the cycle automatically
// - Prove a single call never returns duplicate picks
//
// INVARIANTS TESTED:
// - N calls with top_n=1 against N books yield N distinct ids
// - The (N+1)th call resets the cycle and may repeat
// - top_n larger than the corpus returns the whole corpus once, no padding
// - Unsupported method names and top_n=0 are rejected

#[cfg(test)]
mod cycle_tests {
    use crate::db::{create_test_pool, initialize_database};
    use crate::domain::Book;
    use crate::error::AppError;
    use crate::repositories::{RecommendationRepository, SqliteRecommendationRepository};
    use crate::services::recommender_service::{Method, RecommenderService};
    use std::collections::BTreeSet;
    use std::str::FromStr;
    use std::sync::Arc;

    fn history() -> Arc<SqliteRecommendationRepository> {
        let pool = Arc::new(create_test_pool().unwrap());
        {
            let conn = pool.get().unwrap();
            initialize_database(&conn).unwrap();
        }
        Arc::new(SqliteRecommendationRepository::new(pool))
    }

    fn book(id: i64, title: &str, author: &str, topics: &[&str]) -> Book {
        Book::new(
            id,
            title.to_string(),
            author.to_string(),
            topics.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn shelf() -> Vec<Book> {
        vec![
            book(1, "Dune", "Frank Herbert", &["sci-fi"]),
            book(2, "The Hobbit", "J.R.R. Tolkien", &["fantasy"]),
            book(3, "Neuromancer", "William Gibson", &["sci-fi", "cyberpunk"]),
            book(4, "Emma", "Jane Austen", &["classic"]),
        ]
    }

    #[test]
    fn test_n_calls_yield_n_distinct_books_before_any_repeat() {
        let history = history();
        let service = RecommenderService::new(history.clone());
        let books = shelf();

        let mut seen = BTreeSet::new();
        for _ in 0..books.len() {
            let outcome = service
                .recommend(&books, Method::Tfidf, None, 1)
                .unwrap();
            assert_eq!(outcome.picks.len(), 1);
            assert!(
                seen.insert(outcome.picks[0].book.id),
                "book {} repeated before the cycle was exhausted",
                outcome.picks[0].book.id
            );
        }
        assert_eq!(seen.len(), books.len());
    }

    #[test]
    fn test_exhausted_cycle_resets_and_may_repeat() {
        let history = history();
        let service = RecommenderService::new(history.clone());
        let books = shelf();

        for _ in 0..books.len() {
            service.recommend(&books, Method::Tfidf, None, 1).unwrap();
        }
        assert_eq!(history.all_recommended().unwrap().len(), books.len());

        // (N+1)th call: automatic reset, a first-cycle book is legal again
        let outcome = service.recommend(&books, Method::Tfidf, None, 1).unwrap();
        assert!(outcome.cycle_reset);
        assert_eq!(outcome.picks.len(), 1);
        assert_eq!(history.all_recommended().unwrap().len(), 1);
    }

    #[test]
    fn test_top_n_larger_than_corpus_returns_corpus_once() {
        let history = history();
        let service = RecommenderService::new(history);
        let books = vec![
            book(1, "Dune", "Frank Herbert", &["sci-fi"]),
            book(2, "The Hobbit", "J.R.R. Tolkien", &["fantasy"]),
        ];

        let outcome = service.recommend(&books, Method::Tfidf, None, 5).unwrap();

        // Exactly 2 books, not an error, not padded with duplicates
        assert_eq!(outcome.picks.len(), 2);
        assert!(outcome.cycle_reset);
        let ids: BTreeSet<i64> = outcome.picks.iter().map(|p| p.book.id).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_mid_batch_reset_never_duplicates_within_one_call() {
        let history = history();
        let service = RecommenderService::new(history.clone());
        let books = shelf();

        // Leave one book unrecommended, then ask for three
        for id in [1, 2, 3] {
            history.record(id, chrono::Utc::now()).unwrap();
        }
        let outcome = service.recommend(&books, Method::Tfidf, None, 3).unwrap();

        assert!(outcome.cycle_reset);
        assert_eq!(outcome.picks.len(), 3);
        assert_eq!(outcome.picks[0].book.id, 4, "the last unrecommended book ranks first");
        let ids: BTreeSet<i64> = outcome.picks.iter().map(|p| p.book.id).collect();
        assert_eq!(ids.len(), 3, "no duplicate picks within one call");
    }

    #[test]
    fn test_query_scenario_excludes_previous_pick() {
        let history = history();
        let service = RecommenderService::new(history);
        let books = vec![
            book(1, "Dune", "Frank Herbert", &["sci-fi"]),
            book(2, "The Hobbit", "J.R.R. Tolkien", &["fantasy"]),
        ];

        let first = service
            .recommend(&books, Method::Query, Some("sci-fi"), 1)
            .unwrap();
        assert_eq!(first.picks[0].book.id, 1);

        // Book 1 is now recorded; the same query must pick book 2
        let second = service
            .recommend(&books, Method::Query, Some("sci-fi"), 1)
            .unwrap();
        assert_eq!(second.picks[0].book.id, 2);
    }

    #[test]
    fn test_fuzzy_matches_title() {
        let history = history();
        let service = RecommenderService::new(history);
        let books = shelf();

        let outcome = service
            .recommend(&books, Method::Fuzzy, Some("the hobit"), 1)
            .unwrap();
        assert_eq!(outcome.picks[0].book.id, 2);
    }

    #[test]
    fn test_fuzzy_with_no_title_match_falls_back_to_query() {
        let history = history();
        let service = RecommenderService::new(history);
        let books = shelf();

        // No title clears the fuzzy threshold, but "cyberpunk" is a topic
        let outcome = service
            .recommend(&books, Method::Fuzzy, Some("cyberpunk"), 1)
            .unwrap();
        assert_eq!(outcome.picks.len(), 1);
        assert_eq!(outcome.picks[0].book.id, 3);
    }

    #[test]
    fn test_fuzzy_never_fails_on_disjoint_query() {
        let history = history();
        let service = RecommenderService::new(history);
        let books = shelf();

        let outcome = service
            .recommend(&books, Method::Fuzzy, Some("qqqqzzzz"), 1)
            .unwrap();
        assert_eq!(outcome.picks.len(), 1);
    }

    #[test]
    fn test_history_is_pruned_against_the_snapshot() {
        let history = history();
        let service = RecommenderService::new(history.clone());

        // Stale id from a removed book must not block future picks
        history.record(99, chrono::Utc::now()).unwrap();
        let books = vec![book(1, "Dune", "Frank Herbert", &[])];

        let outcome = service.recommend(&books, Method::Tfidf, None, 1).unwrap();
        assert_eq!(outcome.picks[0].book.id, 1);
        assert_eq!(history.all_recommended().unwrap(), BTreeSet::from([1]));
    }

    #[test]
    fn test_empty_catalog_fails() {
        let service = RecommenderService::new(history());
        let err = service.recommend(&[], Method::Tfidf, None, 1).unwrap_err();
        assert!(matches!(err, AppError::EmptyCatalog));
    }

    #[test]
    fn test_zero_top_n_is_invalid() {
        let service = RecommenderService::new(history());
        let err = service
            .recommend(&shelf(), Method::Tfidf, None, 0)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_query_method_without_query_is_invalid() {
        let service = RecommenderService::new(history());
        let err = service
            .recommend(&shelf(), Method::Query, None, 1)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_method_name_is_rejected() {
        let err = Method::from_str("bayes").unwrap_err();
        match err {
            AppError::UnsupportedMethod(name) => assert_eq!(name, "bayes"),
            other => panic!("expected UnsupportedMethod, got {:?}", other),
        }
    }

    #[test]
    fn test_method_names_round_trip() {
        for name in ["tfidf", "query", "fuzzy"] {
            assert_eq!(Method::from_str(name).unwrap().to_string(), name);
        }
    }

    #[test]
    fn test_clear_history_is_idempotent() {
        let history = history();
        let service = RecommenderService::new(history.clone());

        service.clear_history().unwrap();
        history.record(1, chrono::Utc::now()).unwrap();
        service.clear_history().unwrap();
        service.clear_history().unwrap();

        assert!(history.all_recommended().unwrap().is_empty());
    }
}
