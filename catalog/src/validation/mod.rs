use crate::model::{
    NewAuthor, NewBook, AUTHOR_NAME_MAX_LENGTH, BOOK_NAME_MAX_LENGTH, MIN_EDITION,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name -> human-readable messages. Serializes as a plain JSON object,
/// which is the body clients receive for a rejected write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error map holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Merge `other` into `self`, skipping fields that already carry an error.
    pub fn merge_missing(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_insert(messages);
        }
    }

    /// `Ok(value)` when no errors were collected.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

// ── Messages ─────────────────────────────────────────────────────────

pub(crate) const NOT_BLANK: &str = "This field may not be blank.";

pub(crate) fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

pub(crate) fn min_value_message(min: i32) -> String {
    format!("Ensure this value is greater than or equal to {min}.")
}

pub(crate) fn max_value_message(max: i32) -> String {
    format!("Ensure this value is less than or equal to {max}.")
}

// ── Field rules ──────────────────────────────────────────────────────

/// A name must hold something besides whitespace, and its length is counted
/// in characters.
pub fn check_name(errors: &mut FieldErrors, field: &str, name: &str, max: usize) {
    if name.trim().is_empty() {
        errors.add(field, NOT_BLANK);
    } else if name.chars().count() > max {
        errors.add(field, max_length_message(max));
    }
}

pub fn check_edition(errors: &mut FieldErrors, edition: i32) {
    if edition < MIN_EDITION {
        errors.add("edition", min_value_message(MIN_EDITION));
    }
}

/// The upper bound is whatever year the caller considers "now".
pub fn check_publication_year(errors: &mut FieldErrors, year: i32, current_year: i32) {
    if year > current_year {
        errors.add("publication_year", max_value_message(current_year));
    }
}

/// Validate an author's fields against the entity constraints.
pub fn validate_author(author: &NewAuthor) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "name", &author.name, AUTHOR_NAME_MAX_LENGTH);
    errors
}

/// Validate a book's fields against the entity constraints.
/// An empty author set is allowed at this level.
pub fn validate_book(book: &NewBook, current_year: i32) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "name", &book.name, BOOK_NAME_MAX_LENGTH);
    check_edition(&mut errors, book.edition);
    check_publication_year(&mut errors, book.publication_year, current_year);
    errors
}
