use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the recommendation history.
///
/// Append-only within a cycle; the set of recorded book ids is kept a
/// subset of the current catalog ids by pruning after each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Id of the recommended book
    pub book_id: i64,

    /// When the recommendation was recorded
    pub recommended_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn new(book_id: i64, recommended_at: DateTime<Utc>) -> Self {
        Self {
            book_id,
            recommended_at,
        }
    }
}
