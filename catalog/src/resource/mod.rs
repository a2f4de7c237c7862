use crate::clock::{Clock, SystemClock};
use crate::config::CatalogConfig;
use crate::db::Database;
use crate::error::{CatalogError, Result};
use crate::filter::{AuthorFilter, BookFilter};
use crate::model::{AuthorId, BookId, NewAuthor};
use crate::pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE};
use crate::transfer::{self, AuthorRepr, BookRepr, WriteMode};
use crate::validation;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const AUTHORS: &str = "authors";
const BOOKS: &str = "books";

/// The main entry point: owns the database, the clock used for date rules,
/// and the list page size, and hands out per-resource handles.
pub struct Catalog {
    db: Mutex<Database>,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl Catalog {
    /// Open the catalog described by `config`, creating the database if needed.
    pub fn open(config: &CatalogConfig) -> Result<Self> {
        log::info!("Opening catalog database at {}", config.database.display());
        let db = Database::open(&config.database)?;
        Ok(Self::new(db).with_page_size(config.page_size))
    }

    /// An empty catalog in memory (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Catalog {
            db: Mutex::new(db),
            clock: Arc::new(SystemClock),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn authors(&self) -> Authors<'_> {
        Authors { catalog: self }
    }

    pub fn books(&self) -> Books<'_> {
        Books { catalog: self }
    }

    /// Record counts and settings, for status output.
    pub fn status(&self) -> Result<serde_json::Value> {
        let db = self.db()?;
        Ok(serde_json::json!({
            "authors": { "count": db.count_authors(&[])? },
            "books": { "count": db.count_books(&[])? },
            "page_size": self.page_size,
        }))
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| CatalogError::Other("catalog database lock poisoned".into()))
    }
}

// ── Authors ──────────────────────────────────────────────────────────

/// Operations on the author resource.
pub struct Authors<'a> {
    catalog: &'a Catalog,
}

impl<'a> Authors<'a> {
    /// Filtered, paginated list. Reads `name` and `page` from `params`.
    pub fn list(&self, params: &HashMap<String, String>) -> Result<Page<AuthorRepr>> {
        let filter = AuthorFilter::from_query(params)?;
        let request = PageRequest::from_query(params)?;
        let predicates = filter.predicates();
        log::debug!("Listing authors with {predicates:?}");

        let db = self.catalog.db()?;
        let window = request.resolve(db.count_authors(&predicates)?, self.catalog.page_size)?;
        let authors = db.list_authors(&predicates, window.size, window.offset())?;
        Ok(window.into_page(authors).map(AuthorRepr::from))
    }

    pub fn retrieve(&self, id: AuthorId) -> Result<AuthorRepr> {
        let db = self.catalog.db()?;
        db.get_author(id)?
            .map(AuthorRepr::from)
            .ok_or_else(|| CatalogError::not_found(AUTHORS, id))
    }

    pub fn create(&self, body: &serde_json::Value) -> Result<AuthorRepr> {
        let author = transfer::parse_author(body, WriteMode::Full, None).map_err(rejected)?;

        let db = self.catalog.db()?;
        let id = db.insert_author(&author)?;
        log::info!("Created author {id}");
        Ok(AuthorRepr {
            id,
            name: author.name,
        })
    }

    /// Replace every writable field.
    pub fn update(&self, id: AuthorId, body: &serde_json::Value) -> Result<AuthorRepr> {
        self.write(id, body, WriteMode::Full)
    }

    /// Replace only the supplied fields.
    pub fn partial_update(&self, id: AuthorId, body: &serde_json::Value) -> Result<AuthorRepr> {
        self.write(id, body, WriteMode::Partial)
    }

    /// Delete the author. Books keep existing without it.
    pub fn delete(&self, id: AuthorId) -> Result<()> {
        let db = self.catalog.db()?;
        if !db.delete_author(id)? {
            return Err(CatalogError::not_found(AUTHORS, id));
        }
        log::info!("Deleted author {id}");
        Ok(())
    }

    pub fn exists(&self, id: AuthorId) -> Result<bool> {
        Ok(self.catalog.db()?.get_author(id)?.is_some())
    }

    pub fn count(&self) -> Result<u64> {
        self.catalog.db()?.count_authors(&[])
    }

    /// Insert many authors in one transaction. Every name is checked against
    /// the entity rules first; one bad name inserts nothing.
    pub fn bulk_create(&self, names: Vec<String>) -> Result<Vec<AuthorId>> {
        let authors: Vec<NewAuthor> = names.into_iter().map(|name| NewAuthor { name }).collect();
        for author in &authors {
            let errors = validation::validate_author(author);
            if !errors.is_empty() {
                return Err(rejected(CatalogError::Validation(errors)));
            }
        }

        let db = self.catalog.db()?;
        let ids = db.transaction(|db| {
            authors
                .iter()
                .map(|author| db.insert_author(author))
                .collect::<Result<Vec<_>>>()
        })?;
        log::info!("Bulk created {} authors", ids.len());
        Ok(ids)
    }

    fn write(&self, id: AuthorId, body: &serde_json::Value, mode: WriteMode) -> Result<AuthorRepr> {
        let db = self.catalog.db()?;
        let current = db
            .get_author(id)?
            .ok_or_else(|| CatalogError::not_found(AUTHORS, id))?;

        let author = transfer::parse_author(body, mode, Some(&current)).map_err(rejected)?;
        db.update_author(id, &author)?;
        log::info!("Updated author {id}");
        Ok(AuthorRepr {
            id,
            name: author.name,
        })
    }
}

// ── Books ────────────────────────────────────────────────────────────

/// Operations on the book resource.
pub struct Books<'a> {
    catalog: &'a Catalog,
}

impl<'a> Books<'a> {
    /// Filtered, paginated list. Reads `name`, `publication_year`, `edition`,
    /// `author` and `page` from `params`.
    pub fn list(&self, params: &HashMap<String, String>) -> Result<Page<BookRepr>> {
        let filter = BookFilter::from_query(params)?;
        let request = PageRequest::from_query(params)?;
        let predicates = filter.predicates();
        log::debug!("Listing books with {predicates:?}");

        let db = self.catalog.db()?;
        let window = request.resolve(db.count_books(&predicates)?, self.catalog.page_size)?;
        let books = db.list_books(&predicates, window.size, window.offset())?;
        Ok(window.into_page(books).map(BookRepr::from))
    }

    pub fn retrieve(&self, id: BookId) -> Result<BookRepr> {
        let db = self.catalog.db()?;
        db.get_book(id)?
            .map(BookRepr::from)
            .ok_or_else(|| CatalogError::not_found(BOOKS, id))
    }

    pub fn create(&self, body: &serde_json::Value) -> Result<BookRepr> {
        let current_year = self.catalog.clock.current_year();
        let db = self.catalog.db()?;

        let book = db.transaction(|db| {
            let new = transfer::parse_book(body, WriteMode::Full, None, current_year, db)
                .map_err(rejected)?;
            let id = db.insert_book(&new)?;
            db.get_book(id)?
                .ok_or_else(|| CatalogError::Other(format!("book {id} vanished after insert")))
        })?;

        log::info!("Created book {} with {} author(s)", book.id, book.authors.len());
        Ok(book.into())
    }

    /// Replace every writable field. An omitted `edition` resets to the default.
    pub fn update(&self, id: BookId, body: &serde_json::Value) -> Result<BookRepr> {
        self.write(id, body, WriteMode::Full)
    }

    /// Replace only the supplied fields; the merged record is re-validated.
    pub fn partial_update(&self, id: BookId, body: &serde_json::Value) -> Result<BookRepr> {
        self.write(id, body, WriteMode::Partial)
    }

    pub fn delete(&self, id: BookId) -> Result<()> {
        let db = self.catalog.db()?;
        if !db.delete_book(id)? {
            return Err(CatalogError::not_found(BOOKS, id));
        }
        log::info!("Deleted book {id}");
        Ok(())
    }

    pub fn exists(&self, id: BookId) -> Result<bool> {
        Ok(self.catalog.db()?.get_book(id)?.is_some())
    }

    pub fn count(&self) -> Result<u64> {
        self.catalog.db()?.count_books(&[])
    }

    fn write(&self, id: BookId, body: &serde_json::Value, mode: WriteMode) -> Result<BookRepr> {
        let current_year = self.catalog.clock.current_year();
        let db = self.catalog.db()?;

        let book = db.transaction(|db| {
            let current = db
                .get_book(id)?
                .ok_or_else(|| CatalogError::not_found(BOOKS, id))?;
            let new = transfer::parse_book(body, mode, Some(&current), current_year, db)
                .map_err(rejected)?;
            db.update_book(id, &new)?;
            db.get_book(id)?
                .ok_or_else(|| CatalogError::not_found(BOOKS, id))
        })?;

        log::info!("Updated book {id}");
        Ok(book.into())
    }
}

/// Log validation failures on the way out.
fn rejected(e: CatalogError) -> CatalogError {
    if let CatalogError::Validation(errors) = &e {
        log::warn!("Rejected write: {errors}");
    }
    e
}
