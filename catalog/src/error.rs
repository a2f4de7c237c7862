use crate::validation::FieldErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Not found: {resource}/{id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Invalid page")]
    InvalidPage,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Import failed at line {line}: {message}")]
    Import { line: u64, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<FieldErrors> for CatalogError {
    fn from(errors: FieldErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
