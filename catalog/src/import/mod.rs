//! One-shot bulk load of authors from a CSV file.
//!
//! The file has no header row. The first column of every row becomes an
//! author name, verbatim. Empty lines are not rows and are skipped. Any
//! unreadable row, blank or over-long name, or database error aborts the run
//! with nothing committed.

use crate::error::{CatalogError, Result};
use crate::model::{AuthorId, AUTHOR_NAME_MAX_LENGTH};
use crate::resource::Catalog;
use crate::validation::{self, FieldErrors};
use std::io::Read;
use std::path::Path;

/// Read author names from column 0 of every CSV row.
pub fn read_author_names<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut names = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let name = record.get(0).ok_or_else(|| CatalogError::Import {
            line,
            message: "row has no columns".into(),
        })?;

        let mut errors = FieldErrors::new();
        validation::check_name(&mut errors, "name", name, AUTHOR_NAME_MAX_LENGTH);
        if !errors.is_empty() {
            return Err(CatalogError::Import {
                line,
                message: errors.to_string(),
            });
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Import authors from `reader` into `catalog` as a single transaction.
/// Returns the new ids in file order.
pub fn import_authors<R: Read>(catalog: &Catalog, reader: R) -> Result<Vec<AuthorId>> {
    let names = read_author_names(reader)?;
    catalog.authors().bulk_create(names)
}

/// Import authors from the CSV file at `path`.
pub fn import_authors_from_path(catalog: &Catalog, path: &Path) -> Result<Vec<AuthorId>> {
    log::info!("Importing authors from {}", path.display());
    let file = std::fs::File::open(path)?;
    let ids = import_authors(catalog, file)?;
    log::info!("Imported {} authors from {}", ids.len(), path.display());
    Ok(ids)
}
