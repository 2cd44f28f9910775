use serde::{Deserialize, Serialize};

/// A book in the local catalog snapshot
/// This is the root entity the recommender operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Calibre book id, stable across cache refreshes
    pub id: i64,

    /// Book title
    pub title: String,

    /// Author(s), comma-joined the way the Calibre server reports them
    pub author: String,

    /// Topics / tags (may be empty)
    pub topics: Vec<String>,
}

impl Book {
    pub fn new(id: i64, title: String, author: String, topics: Vec<String>) -> Self {
        Self {
            id,
            title,
            author,
            topics,
        }
    }

    /// Combined text the similarity model is built over:
    /// title, author and topics joined with whitespace.
    pub fn combined_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.author.len() + self.topics.iter().map(|t| t.len() + 1).sum::<usize>() + 2,
        );
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.author);
        for topic in &self.topics {
            text.push(' ');
            text.push_str(topic);
        }
        text
    }
}
