use serde::{Deserialize, Serialize};

pub type AuthorId = i64;
pub type BookId = i64;

pub const AUTHOR_NAME_MAX_LENGTH: usize = 30;
pub const BOOK_NAME_MAX_LENGTH: usize = 60;
pub const MIN_EDITION: i32 = 1;
pub const DEFAULT_EDITION: i32 = 1;

/// A persisted author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// The writable fields of an author, before an id has been assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
}

/// A persisted book record together with its author set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub edition: i32,
    pub publication_year: i32,
    /// Sorted ascending, no duplicates.
    pub authors: Vec<AuthorId>,
}

/// The writable fields of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub name: String,
    pub edition: i32,
    pub publication_year: i32,
    pub authors: Vec<AuthorId>,
}

/// Sort and de-duplicate a list of author references in place.
pub fn normalize_author_ids(ids: &mut Vec<AuthorId>) {
    ids.sort_unstable();
    ids.dedup();
}
