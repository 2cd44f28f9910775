// src/services/similarity.rs
//
// Textual similarity over the catalog
//
// Two scorers, never mixed:
// - TF-IDF vectors + cosine similarity, range [0, 1]
// - token-set ratio (edit-distance based), range [0, 100]
//
// The model is ephemeral: rebuilt from the current snapshot on every run.

use std::collections::{BTreeSet, HashMap};
use std::cmp::Ordering;

use regex::Regex;

use crate::domain::Book;

/// Sparse vector: (vocabulary index, weight), indices strictly ascending.
pub type SparseVec = Vec<(usize, f64)>;

/// TF-IDF model over a fixed document corpus.
///
/// Weights use the smoothed idf `ln((1 + n) / (1 + df)) + 1` and rows are
/// L2-normalized, matching the conventional vectorizer behavior.
pub struct TfidfModel {
    token_re: Regex,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVec>,
}

impl TfidfModel {
    pub fn fit(docs: &[String]) -> Self {
        let token_re = Regex::new(r"[a-z0-9]+").expect("valid token pattern");

        // Pass 1: vocabulary and document frequencies
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let mut doc_tokens: Vec<Vec<usize>> = Vec::with_capacity(docs.len());

        for doc in docs {
            let mut indices = Vec::new();
            let mut seen: BTreeSet<usize> = BTreeSet::new();
            for token in tokenize_with(&token_re, doc) {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(token).or_insert(next);
                if idx == doc_freq.len() {
                    doc_freq.push(0);
                }
                if seen.insert(idx) {
                    doc_freq[idx] += 1;
                }
                indices.push(idx);
            }
            doc_tokens.push(indices);
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        // Pass 2: weighted, normalized document vectors
        let vectors = doc_tokens
            .iter()
            .map(|indices| Self::weigh(indices, &idf))
            .collect();

        Self {
            token_re,
            vocabulary,
            idf,
            vectors,
        }
    }

    fn weigh(token_indices: &[usize], idf: &[f64]) -> SparseVec {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for &idx in token_indices {
            *counts.entry(idx).or_insert(0) += 1;
        }

        let mut vector: SparseVec = counts
            .into_iter()
            .map(|(idx, count)| (idx, count as f64 * idf[idx]))
            .collect();
        vector.sort_by_key(|&(idx, _)| idx);
        normalize(&mut vector);
        vector
    }

    /// Normalized vector of the i-th fitted document.
    pub fn vector(&self, i: usize) -> &SparseVec {
        &self.vectors[i]
    }

    /// Project free text into the fitted vocabulary. Tokens the corpus has
    /// never seen are dropped.
    pub fn transform(&self, text: &str) -> SparseVec {
        let indices: Vec<usize> = tokenize_with(&self.token_re, text)
            .into_iter()
            .filter_map(|token| self.vocabulary.get(&token).copied())
            .collect();
        Self::weigh(&indices, &self.idf)
    }

    /// Mean of the given document vectors. Empty input yields the zero vector.
    pub fn centroid(&self, doc_indices: &[usize]) -> SparseVec {
        let mut sums: HashMap<usize, f64> = HashMap::new();
        for &doc in doc_indices {
            for &(idx, weight) in &self.vectors[doc] {
                *sums.entry(idx).or_insert(0.0) += weight;
            }
        }

        let count = doc_indices.len() as f64;
        let mut vector: SparseVec = sums
            .into_iter()
            .map(|(idx, sum)| (idx, sum / count))
            .collect();
        vector.sort_by_key(|&(idx, _)| idx);
        vector
    }
}

fn tokenize_with(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn normalize(vector: &mut SparseVec) {
    let norm = vector.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
}

/// Cosine similarity between two sparse vectors. Zero vectors score 0.
pub fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let norm_a = a.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // Sparse dot product over ascending indices
    let mut dot = 0.0;
    let mut ia = 0;
    let mut ib = 0;
    while ia < a.len() && ib < b.len() {
        match a[ia].0.cmp(&b[ib].0) {
            Ordering::Less => ia += 1,
            Ordering::Greater => ib += 1,
            Ordering::Equal => {
                dot += a[ia].1 * b[ib].1;
                ia += 1;
                ib += 1;
            }
        }
    }

    dot / (norm_a * norm_b)
}

/// Token-set ratio between two strings, on a 0-100 scale.
///
/// Both sides are tokenized and deduplicated; the score is the best
/// longest-common-subsequence ratio among the intersection string and the
/// two intersection+remainder strings. Total for every input.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> BTreeSet<String> {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    };
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);

    let common: Vec<&String> = tokens_a.intersection(&tokens_b).collect();
    let only_a: Vec<&String> = tokens_a.difference(&tokens_b).collect();
    let only_b: Vec<&String> = tokens_b.difference(&tokens_a).collect();

    let join = |parts: &[&String]| {
        parts
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let base = join(&common);
    let combined_a = join(&[common.clone(), only_a].concat());
    let combined_b = join(&[common, only_b].concat());

    if combined_a.is_empty() && combined_b.is_empty() {
        return 0.0;
    }

    lcs_ratio(&base, &combined_a)
        .max(lcs_ratio(&base, &combined_b))
        .max(lcs_ratio(&combined_a, &combined_b))
}

/// 200 * lcs / (len_a + len_b): the classic sequence-matcher ratio.
fn lcs_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 0.0;
    }
    200.0 * lcs_length(a, b) as f64 / total as f64
}

fn lcs_length(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity rankings over one catalog snapshot.
///
/// All rankings exclude the given id set, sort by descending score and
/// break ties by ascending book id, so the output is deterministic and
/// independent of candidate order.
pub struct SimilarityEngine {
    ids: Vec<i64>,
    titles: Vec<String>,
    model: TfidfModel,
}

impl SimilarityEngine {
    pub fn fit(books: &[Book]) -> Self {
        let docs: Vec<String> = books.iter().map(Book::combined_text).collect();
        Self {
            ids: books.iter().map(|b| b.id).collect(),
            titles: books.iter().map(|b| b.title.clone()).collect(),
            model: TfidfModel::fit(&docs),
        }
    }

    /// Content mode: rank against the centroid of the excluded (already
    /// recommended) books' vectors, or the corpus centroid when nothing is
    /// excluded yet.
    pub fn rank_content(&self, excluded: &BTreeSet<i64>) -> Vec<(i64, f64)> {
        let reference_docs: Vec<usize> = if excluded.is_empty() {
            (0..self.ids.len()).collect()
        } else {
            self.ids
                .iter()
                .enumerate()
                .filter(|&(_, id)| excluded.contains(id))
                .map(|(i, _)| i)
                .collect()
        };
        let reference = self.model.centroid(&reference_docs);

        self.rank_by(excluded, |i| cosine(self.model.vector(i), &reference))
    }

    /// Query mode: rank against the query projected into the corpus vocabulary.
    pub fn rank_query(&self, query: &str, excluded: &BTreeSet<i64>) -> Vec<(i64, f64)> {
        let query_vec = self.model.transform(query);
        self.rank_by(excluded, |i| cosine(self.model.vector(i), &query_vec))
    }

    /// Fuzzy mode: rank titles by token-set ratio against the query.
    pub fn rank_fuzzy(&self, query: &str, excluded: &BTreeSet<i64>) -> Vec<(i64, f64)> {
        self.rank_by(excluded, |i| token_set_ratio(query, &self.titles[i]))
    }

    fn rank_by<F: Fn(usize) -> f64>(&self, excluded: &BTreeSet<i64>, score: F) -> Vec<(i64, f64)> {
        let mut ranked: Vec<(i64, f64)> = self
            .ids
            .iter()
            .enumerate()
            .filter(|&(_, id)| !excluded.contains(id))
            .map(|(i, &id)| (id, score(i)))
            .collect();

        ranked.sort_by(|x, y| {
            y.1.partial_cmp(&x.1)
                .unwrap_or(Ordering::Equal)
                .then(x.0.cmp(&y.0))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, author: &str, topics: &[&str]) -> Book {
        Book::new(
            id,
            title.to_string(),
            author.to_string(),
            topics.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn corpus() -> Vec<Book> {
        vec![
            book(1, "Dune", "Frank Herbert", &["sci-fi"]),
            book(2, "The Hobbit", "J.R.R. Tolkien", &["fantasy"]),
            book(3, "Dune Messiah", "Frank Herbert", &["sci-fi"]),
        ]
    }

    #[test]
    fn test_query_ranking_prefers_topic_match() {
        let engine = SimilarityEngine::fit(&corpus());
        let ranked = engine.rank_query("sci-fi", &BTreeSet::new());

        assert_eq!(ranked.len(), 3);
        // Both sci-fi books outrank the fantasy one
        assert!(ranked[0].0 == 1 || ranked[0].0 == 3);
        assert_eq!(ranked[2].0, 2);
        assert_eq!(ranked[2].1, 0.0);
    }

    #[test]
    fn test_ranking_excludes_recommended_ids() {
        let engine = SimilarityEngine::fit(&corpus());
        let ranked = engine.rank_query("sci-fi", &BTreeSet::from([1]));

        assert!(ranked.iter().all(|&(id, _)| id != 1));
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_ranking_is_invariant_to_candidate_order() {
        let mut reversed = corpus();
        reversed.reverse();

        let forward = SimilarityEngine::fit(&corpus()).rank_query("dune", &BTreeSet::new());
        let backward = SimilarityEngine::fit(&reversed).rank_query("dune", &BTreeSet::new());

        let forward_ids: Vec<i64> = forward.iter().map(|&(id, _)| id).collect();
        let backward_ids: Vec<i64> = backward.iter().map(|&(id, _)| id).collect();
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let books = vec![
            book(7, "Same", "Author", &[]),
            book(3, "Same", "Author", &[]),
        ];
        let engine = SimilarityEngine::fit(&books);
        let ranked = engine.rank_query("same", &BTreeSet::new());

        assert_eq!(ranked[0].0, 3);
        assert_eq!(ranked[1].0, 7);
    }

    #[test]
    fn test_cosine_scores_stay_in_unit_range() {
        let engine = SimilarityEngine::fit(&corpus());
        for (_, score) in engine.rank_query("dune frank herbert sci fi", &BTreeSet::new()) {
            assert!((0.0..=1.0 + 1e-9).contains(&score));
        }
    }

    #[test]
    fn test_blank_metadata_degrades_to_id_order() {
        let books = vec![book(2, " ", "", &[]), book(1, " ", "", &[])];
        let engine = SimilarityEngine::fit(&books);

        let ranked = engine.rank_content(&BTreeSet::new());
        assert_eq!(ranked, vec![(1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn test_single_book_corpus_never_fails() {
        let books = vec![book(1, "Dune", "Frank Herbert", &[])];
        let engine = SimilarityEngine::fit(&books);

        assert_eq!(engine.rank_content(&BTreeSet::new()).len(), 1);
        assert_eq!(engine.rank_fuzzy("dune", &BTreeSet::new()).len(), 1);
    }

    #[test]
    fn test_content_mode_uses_recommended_profile() {
        let engine = SimilarityEngine::fit(&corpus());
        // With Dune recommended, the other Herbert book beats the Tolkien one
        let ranked = engine.rank_content(&BTreeSet::from([1]));

        assert_eq!(ranked[0].0, 3);
        assert_eq!(ranked[1].0, 2);
    }

    #[test]
    fn test_query_with_unknown_vocabulary_scores_zero() {
        let engine = SimilarityEngine::fit(&corpus());
        let ranked = engine.rank_query("zzzz qqqq", &BTreeSet::new());

        assert!(ranked.iter().all(|&(_, score)| score == 0.0));
        // Zero-information fallback: ascending id
        let ids: Vec<i64> = ranked.iter().map(|&(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_token_set_ratio_exact_match() {
        assert_eq!(token_set_ratio("the hobbit", "The Hobbit"), 100.0);
    }

    #[test]
    fn test_token_set_ratio_subset_scores_high() {
        let score = token_set_ratio("hobbit", "The Hobbit");
        assert!(score >= 80.0, "got {}", score);
    }

    #[test]
    fn test_token_set_ratio_total_for_disjoint_strings() {
        let score = token_set_ratio("xyz", "Dune");
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_token_set_ratio_empty_inputs() {
        assert_eq!(token_set_ratio("", ""), 0.0);
        assert_eq!(token_set_ratio("", "Dune"), 0.0);
    }

    #[test]
    fn test_transform_drops_unseen_tokens() {
        let model = TfidfModel::fit(&["dune herbert".to_string()]);
        assert!(model.transform("unrelated words").is_empty());
        assert!(!model.transform("dune").is_empty());
    }
}
