//! Wire representation of authors and books.
//!
//! Output is a plain serde struct per entity. Input is read field by field from
//! a JSON object so that every problem can be reported against the field that
//! caused it, the same way a client sees it.

use crate::error::{CatalogError, Result};
use crate::model::{
    normalize_author_ids, Author, AuthorId, Book, BookId, NewAuthor, NewBook, DEFAULT_EDITION,
};
use crate::validation::{self, FieldErrors};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_INTEGER: &str = "A valid integer is required.";
const EMPTY_LIST: &str = "This list may not be empty.";

/// Answers whether author ids exist. Implemented by the storage layer.
pub trait AuthorLookup {
    /// The subset of `ids` that do not name an existing author, in input order.
    fn missing_authors(&self, ids: &[AuthorId]) -> Result<Vec<AuthorId>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRepr {
    pub id: AuthorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRepr {
    pub id: BookId,
    pub name: String,
    pub edition: i32,
    pub publication_year: i32,
    pub authors: Vec<AuthorId>,
}

impl From<Author> for AuthorRepr {
    fn from(author: Author) -> Self {
        AuthorRepr {
            id: author.id,
            name: author.name,
        }
    }
}

impl From<Book> for BookRepr {
    fn from(book: Book) -> Self {
        BookRepr {
            id: book.id,
            name: book.name,
            edition: book.edition,
            publication_year: book.publication_year,
            authors: book.authors,
        }
    }
}

/// How absent fields are treated on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or full update: required fields must be present, optional
    /// fields fall back to their defaults.
    Full,
    /// Partial update: absent fields keep their current value.
    Partial,
}

impl WriteMode {
    fn is_partial(self) -> bool {
        self == WriteMode::Partial
    }
}

/// Read an author payload. `existing` supplies the values of fields absent
/// from a partial update.
pub fn parse_author(body: &Value, mode: WriteMode, existing: Option<&Author>) -> Result<NewAuthor> {
    let map = as_object(body)?;
    let mut errors = FieldErrors::new();

    let name = read_name(map, "name", mode, &mut errors);
    let author = NewAuthor {
        name: name
            .or_else(|| existing.map(|a| a.name.clone()))
            .unwrap_or_default(),
    };

    errors.merge_missing(validation::validate_author(&author));
    errors.into_result(author).map_err(CatalogError::Validation)
}

/// Read a book payload, resolving author references through `lookup` and
/// checking the publication year against `current_year`.
pub fn parse_book(
    body: &Value,
    mode: WriteMode,
    existing: Option<&Book>,
    current_year: i32,
    lookup: &dyn AuthorLookup,
) -> Result<NewBook> {
    let map = as_object(body)?;
    let mut errors = FieldErrors::new();

    let name = read_name(map, "name", mode, &mut errors);
    let edition = read_integer(map, "edition", false, mode, &mut errors);
    let publication_year = read_integer(map, "publication_year", true, mode, &mut errors);
    let authors = read_author_refs(map, mode, &mut errors);

    if let Some(ids) = &authors {
        if let Some(missing) = lookup.missing_authors(ids)?.first() {
            errors.add(
                "authors",
                format!("Invalid pk \"{missing}\" - object does not exist."),
            );
        }
    }

    let book = match (mode, existing) {
        (WriteMode::Partial, Some(current)) => NewBook {
            name: name.unwrap_or_else(|| current.name.clone()),
            edition: edition.unwrap_or(current.edition),
            publication_year: publication_year.unwrap_or(current.publication_year),
            authors: authors.unwrap_or_else(|| current.authors.clone()),
        },
        _ => NewBook {
            name: name.unwrap_or_default(),
            edition: edition.unwrap_or(DEFAULT_EDITION),
            // Placeholder only; a missing year has already been reported
            publication_year: publication_year.unwrap_or(i32::MIN),
            authors: authors.unwrap_or_default(),
        },
    };

    errors.merge_missing(validation::validate_book(&book, current_year));
    errors.into_result(book).map_err(CatalogError::Validation)
}

// ── Field readers ────────────────────────────────────────────────────

fn as_object(body: &Value) -> Result<&Map<String, Value>> {
    body.as_object().ok_or_else(|| {
        CatalogError::Validation(FieldErrors::single(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(body)
            ),
        ))
    })
}

/// `None` when the field is absent or invalid. Absence is an error unless the
/// write is partial.
fn read_name(
    map: &Map<String, Value>,
    field: &str,
    mode: WriteMode,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = match map.get(field) {
        Some(v) => v,
        None => {
            if !mode.is_partial() {
                errors.add(field, REQUIRED);
            }
            return None;
        }
    };

    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => {
            errors.add(field, NOT_NULL);
            return None;
        }
        _ => {
            errors.add(field, NOT_STRING);
            return None;
        }
    };

    if text.is_empty() {
        errors.add(field, validation::NOT_BLANK);
        return None;
    }
    Some(text)
}

fn read_integer(
    map: &Map<String, Value>,
    field: &str,
    required: bool,
    mode: WriteMode,
    errors: &mut FieldErrors,
) -> Option<i32> {
    let value = match map.get(field) {
        Some(v) => v,
        None => {
            if required && !mode.is_partial() {
                errors.add(field, REQUIRED);
            }
            return None;
        }
    };

    if value.is_null() {
        errors.add(field, NOT_NULL);
        return None;
    }

    let parsed = integer_value(value).and_then(|n| i32::try_from(n).ok());
    if parsed.is_none() {
        errors.add(field, NOT_INTEGER);
    }
    parsed
}

/// Accepts one id or a list of ids. The result is sorted and de-duplicated.
fn read_author_refs(
    map: &Map<String, Value>,
    mode: WriteMode,
    errors: &mut FieldErrors,
) -> Option<Vec<AuthorId>> {
    let value = match map.get("authors") {
        Some(v) => v,
        None => {
            if !mode.is_partial() {
                errors.add("authors", REQUIRED);
            }
            return None;
        }
    };

    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Number(_) | Value::String(_) => vec![value],
        Value::Null => {
            errors.add("authors", NOT_NULL);
            return None;
        }
        other => {
            errors.add(
                "authors",
                format!(
                    "Expected a list of items but got type \"{}\".",
                    type_name(other)
                ),
            );
            return None;
        }
    };

    if items.is_empty() {
        errors.add("authors", EMPTY_LIST);
        return None;
    }

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match integer_value(item) {
            Some(id) => ids.push(id),
            _ => {
                errors.add(
                    "authors",
                    format!(
                        "Incorrect type. Expected pk value, received {}.",
                        type_name(item)
                    ),
                );
                return None;
            }
        }
    }

    normalize_author_ids(&mut ids);
    Some(ids)
}

/// Integers, integral floats and numeric strings.
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
