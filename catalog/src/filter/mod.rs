//! Translation of list query parameters into record-selection predicates.
//!
//! Unknown parameters and empty values are ignored. Every recognized filter
//! narrows the selection; predicates are combined with AND.

use crate::model::AuthorId;
use crate::validation::FieldErrors;
use std::collections::HashMap;

/// A column that filters may reference. Keeping this closed means the SQL
/// rendered from a predicate never contains caller-supplied identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Edition,
    PublicationYear,
}

impl Column {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Edition => "edition",
            Column::PublicationYear => "publication_year",
        }
    }
}

/// A single selection condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Substring match on a text column.
    Contains {
        column: Column,
        value: String,
        case_insensitive: bool,
    },
    /// Exact match on an integer column.
    Equals { column: Column, value: i64 },
    /// The book's author set contains this author.
    HasAuthor(AuthorId),
}

/// Filters accepted by the author list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFilter {
    pub name: Option<String>,
}

impl AuthorFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        Ok(AuthorFilter {
            name: text_param(params, "name"),
        })
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(name) = &self.name {
            predicates.push(Predicate::Contains {
                column: Column::Name,
                value: name.clone(),
                case_insensitive: true,
            });
        }
        predicates
    }
}

/// Filters accepted by the book list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub name: Option<String>,
    pub publication_year: Option<i64>,
    pub edition: Option<i64>,
    /// One author id per request. `author=1,2` is rejected, not split.
    pub author: Option<AuthorId>,
}

impl BookFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let filter = BookFilter {
            name: text_param(params, "name"),
            publication_year: number_param(params, "publication_year", &mut errors),
            edition: number_param(params, "edition", &mut errors),
            author: number_param(params, "author", &mut errors),
        };
        errors.into_result(filter)
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(name) = &self.name {
            predicates.push(Predicate::Contains {
                column: Column::Name,
                value: name.clone(),
                case_insensitive: false,
            });
        }
        if let Some(year) = self.publication_year {
            predicates.push(Predicate::Equals {
                column: Column::PublicationYear,
                value: year,
            });
        }
        if let Some(edition) = self.edition {
            predicates.push(Predicate::Equals {
                column: Column::Edition,
                value: edition,
            });
        }
        if let Some(author) = self.author {
            predicates.push(Predicate::HasAuthor(author));
        }
        predicates
    }
}

fn text_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
}

fn number_param(
    params: &HashMap<String, String>,
    key: &str,
    errors: &mut FieldErrors,
) -> Option<i64> {
    let raw = params.get(key)?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(key, "Enter a whole number.");
            None
        }
    }
}
