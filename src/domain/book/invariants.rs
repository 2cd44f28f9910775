use super::entity::Book;
use crate::domain::{DomainError, DomainResult};

/// Validates all Book invariants
/// These are the absolute rules that must hold for a Book to be valid
pub fn validate_book(book: &Book) -> DomainResult<()> {
    validate_id(book.id)?;
    validate_title(&book.title)?;
    Ok(())
}

/// Calibre ids are positive integers
fn validate_id(id: i64) -> DomainResult<()> {
    if id <= 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Book id must be positive, got {}",
            id
        )));
    }
    Ok(())
}

/// Title cannot be empty
fn validate_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Book title cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Invariants that must hold true for the Book domain:
///
/// 1. Identity (Calibre id) is immutable and positive
/// 2. Title cannot be empty
/// 3. Author may be empty (some catalogs carry no author data)
/// 4. Topics may be empty
/// 5. A Book is immutable within one cache refresh cycle
