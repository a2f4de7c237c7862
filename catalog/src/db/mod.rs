use crate::error::Result;
use crate::filter::Predicate;
use crate::model::{Author, AuthorId, Book, BookId, NewAuthor, NewBook};
use crate::transfer::AuthorLookup;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

/// The SQLite database holding authors, books and the association between them.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                edition INTEGER NOT NULL DEFAULT 1 CHECK (edition >= 1),
                publication_year INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS book_authors (
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                PRIMARY KEY (book_id, author_id)
            );

            CREATE INDEX IF NOT EXISTS idx_book_authors_author ON book_authors(author_id);
            ",
        )?;
        Ok(())
    }

    // ── Authors ──────────────────────────────────────────────────────

    pub fn insert_author(&self, author: &NewAuthor) -> Result<AuthorId> {
        self.conn.execute(
            "INSERT INTO authors (name) VALUES (?1)",
            params![author.name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_author(&self, id: AuthorId) -> Result<Option<Author>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, name FROM authors WHERE id = ?1",
                params![id],
                author_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Returns false when no author has this id.
    pub fn update_author(&self, id: AuthorId, author: &NewAuthor) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE authors SET name = ?1 WHERE id = ?2",
            params![author.name, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete an author. Association rows go with it; books stay.
    pub fn delete_author(&self, id: AuthorId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM authors WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn count_authors(&self, predicates: &[Predicate]) -> Result<u64> {
        self.count("authors", predicates)
    }

    /// One page of authors matching all predicates, ordered by id.
    pub fn list_authors(
        &self,
        predicates: &[Predicate],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Author>> {
        let (clause, mut values) = where_clause(predicates);
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let sql = format!("SELECT id, name FROM authors{clause} ORDER BY id LIMIT ? OFFSET ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), author_from_row)?;

        let mut authors = Vec::new();
        for row in rows {
            authors.push(row?);
        }
        Ok(authors)
    }

    // ── Books ────────────────────────────────────────────────────────

    /// Insert a book and its author links. Run inside a transaction so the
    /// two writes land together.
    pub fn insert_book(&self, book: &NewBook) -> Result<BookId> {
        self.conn.execute(
            "INSERT INTO books (name, edition, publication_year) VALUES (?1, ?2, ?3)",
            params![book.name, book.edition, book.publication_year],
        )?;
        let id = self.conn.last_insert_rowid();
        self.set_book_authors(id, &book.authors)?;
        Ok(id)
    }

    pub fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, edition, publication_year FROM books WHERE id = ?1",
                params![id],
                book_from_row,
            )
            .optional()?;

        match row {
            Some(mut book) => {
                book.authors = self.book_author_ids(book.id)?;
                Ok(Some(book))
            }
            None => Ok(None),
        }
    }

    /// Replace every writable field, including the author set.
    /// Returns false when no book has this id.
    pub fn update_book(&self, id: BookId, book: &NewBook) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE books SET name = ?1, edition = ?2, publication_year = ?3 WHERE id = ?4",
            params![book.name, book.edition, book.publication_year, id],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        self.set_book_authors(id, &book.authors)?;
        Ok(true)
    }

    pub fn delete_book(&self, id: BookId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn count_books(&self, predicates: &[Predicate]) -> Result<u64> {
        self.count("books", predicates)
    }

    /// One page of books matching all predicates, ordered by id.
    pub fn list_books(
        &self,
        predicates: &[Predicate],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Book>> {
        let (clause, mut values) = where_clause(predicates);
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT id, name, edition, publication_year FROM books{clause} ORDER BY id LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), book_from_row)?;

        let mut books = Vec::new();
        for row in rows {
            let mut book = row?;
            book.authors = self.book_author_ids(book.id)?;
            books.push(book);
        }
        Ok(books)
    }

    /// Author ids linked to a book, ascending.
    pub fn book_author_ids(&self, book_id: BookId) -> Result<Vec<AuthorId>> {
        let mut stmt = self.conn.prepare(
            "SELECT author_id FROM book_authors WHERE book_id = ?1 ORDER BY author_id",
        )?;
        let rows = stmt.query_map(params![book_id], |row| row.get::<_, AuthorId>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn set_book_authors(&self, book_id: BookId, authors: &[AuthorId]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM book_authors WHERE book_id = ?1",
            params![book_id],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?1, ?2)",
        )?;
        for author_id in authors {
            stmt.execute(params![book_id, author_id])?;
        }
        Ok(())
    }

    fn count(&self, table: &str, predicates: &[Predicate]) -> Result<u64> {
        let (clause, values) = where_clause(predicates);
        let sql = format!("SELECT COUNT(*) FROM {table}{clause}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Transaction Support ──────────────────────────────────────────

    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    pub fn commit_transaction(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback_transaction(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    /// Transactions do not nest.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback_transaction() {
                    log::error!("Rollback failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}

impl AuthorLookup for Database {
    fn missing_authors(&self, ids: &[AuthorId]) -> Result<Vec<AuthorId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM authors WHERE id = ?1")?;
        let mut missing = Vec::new();
        for id in ids {
            if !stmt.exists(params![id])? {
                missing.push(*id);
            }
        }
        Ok(missing)
    }
}

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Author ids are loaded separately.
fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        name: row.get(1)?,
        edition: row.get(2)?,
        publication_year: row.get(3)?,
        authors: Vec::new(),
    })
}

/// Render predicates as ` WHERE a AND b ...` with positional parameters.
/// Returns an empty clause when there is nothing to filter on.
fn where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
    let mut conditions = Vec::with_capacity(predicates.len());
    let mut values = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        match predicate {
            Predicate::Contains {
                column,
                value,
                case_insensitive,
            } => {
                if *case_insensitive {
                    conditions.push(format!("instr(lower({}), lower(?)) > 0", column.as_sql()));
                } else {
                    conditions.push(format!("instr({}, ?) > 0", column.as_sql()));
                }
                values.push(Value::Text(value.clone()));
            }
            Predicate::Equals { column, value } => {
                conditions.push(format!("{} = ?", column.as_sql()));
                values.push(Value::Integer(*value));
            }
            Predicate::HasAuthor(author_id) => {
                conditions.push(
                    "id IN (SELECT book_id FROM book_authors WHERE author_id = ?)".to_string(),
                );
                values.push(Value::Integer(*author_id));
            }
        }
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Column;

    fn new_book(name: &str, authors: Vec<AuthorId>) -> NewBook {
        NewBook {
            name: name.into(),
            edition: 1,
            publication_year: 2000,
            authors,
        }
    }

    fn author(db: &Database, name: &str) -> AuthorId {
        db.insert_author(&NewAuthor { name: name.into() }).unwrap()
    }

    #[test]
    fn test_insert_and_get_author() {
        let db = Database::open_in_memory().unwrap();
        let id = author(&db, "Ursula K. Le Guin");

        let found = db.get_author(id).unwrap().unwrap();
        assert_eq!(found.name, "Ursula K. Le Guin");
        assert!(db.get_author(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_insert_book_with_authors() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        let b = author(&db, "B");

        let id = db.insert_book(&new_book("Joint work", vec![b, a])).unwrap();
        let book = db.get_book(id).unwrap().unwrap();
        assert_eq!(book.authors, vec![a, b]);
        assert_eq!(book.edition, 1);
    }

    #[test]
    fn test_update_book_replaces_authors() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        let b = author(&db, "B");
        let id = db.insert_book(&new_book("Draft", vec![a])).unwrap();

        let mut changed = new_book("Final", vec![b]);
        changed.edition = 2;
        assert!(db.update_book(id, &changed).unwrap());

        let book = db.get_book(id).unwrap().unwrap();
        assert_eq!(book.name, "Final");
        assert_eq!(book.edition, 2);
        assert_eq!(book.authors, vec![b]);

        assert!(!db.update_book(id + 100, &changed).unwrap());
    }

    #[test]
    fn test_delete_author_unlinks_books() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        let b = author(&db, "B");
        let id = db.insert_book(&new_book("Shared", vec![a, b])).unwrap();

        assert!(db.delete_author(a).unwrap());
        let book = db.get_book(id).unwrap().unwrap();
        assert_eq!(book.authors, vec![b]);
    }

    #[test]
    fn test_delete_book_removes_links() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        let id = db.insert_book(&new_book("Gone", vec![a])).unwrap();

        assert!(db.delete_book(id).unwrap());
        assert!(db.get_book(id).unwrap().is_none());
        assert!(db.get_author(a).unwrap().is_some());
        assert!(!db.delete_book(id).unwrap());
    }

    #[test]
    fn test_author_name_filter_ignores_case() {
        let db = Database::open_in_memory().unwrap();
        author(&db, "New Author 1");
        author(&db, "someone new");
        author(&db, "Other");

        let predicates = vec![Predicate::Contains {
            column: Column::Name,
            value: "NEW".into(),
            case_insensitive: true,
        }];
        assert_eq!(db.count_authors(&predicates).unwrap(), 2);
    }

    #[test]
    fn test_book_name_filter_is_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_book(&new_book("tai ya", vec![])).unwrap();
        db.insert_book(&new_book("YAYA", vec![])).unwrap();

        let predicates = vec![Predicate::Contains {
            column: Column::Name,
            value: "ya".into(),
            case_insensitive: false,
        }];
        let books = db.list_books(&predicates, 10, 0).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "tai ya");
    }

    #[test]
    fn test_has_author_and_equals_combine() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        let b = author(&db, "B");
        db.insert_book(&new_book("one", vec![a])).unwrap();
        db.insert_book(&new_book("two", vec![a, b])).unwrap();
        let mut second = new_book("three", vec![a]);
        second.edition = 2;
        db.insert_book(&second).unwrap();

        let predicates = vec![
            Predicate::HasAuthor(a),
            Predicate::Equals {
                column: Column::Edition,
                value: 1,
            },
        ];
        assert_eq!(db.count_books(&predicates).unwrap(), 2);
        assert_eq!(db.count_books(&[Predicate::HasAuthor(b)]).unwrap(), 1);
    }

    #[test]
    fn test_list_pages_by_id() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..25 {
            author(&db, &format!("Author {i}"));
        }

        let page = db.list_authors(&[], 10, 20).unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].name, "Author 20");
        assert_eq!(db.count_authors(&[]).unwrap(), 25);
    }

    #[test]
    fn test_missing_authors() {
        let db = Database::open_in_memory().unwrap();
        let a = author(&db, "A");
        assert_eq!(db.missing_authors(&[a, 42]).unwrap(), vec![42]);
        assert!(db.missing_authors(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.transaction(|db| {
            db.insert_author(&NewAuthor { name: "kept?".into() })?;
            Err(crate::CatalogError::Other("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.count_authors(&[]).unwrap(), 0);
    }

    #[test]
    fn test_open_file_persists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("catalog.db");
        {
            let db = Database::open(&path).unwrap();
            author(&db, "Persisted");
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_authors(&[]).unwrap(), 1);
    }
}
