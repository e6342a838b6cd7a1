//! Book store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist book scalar fields.
//! - Own the `book_author` and `book_category` association rows: written
//!   together with the book on create, replaced wholesale afterwards.
//! - Enrich every book read with its ordered authors and its categories.
//!
//! # Invariants
//! - Create and association replacement run inside one immediate
//!   transaction; any failed statement leaves storage untouched.
//! - Author `order` is `position + 1` in the list handed to the write.
//! - Listing order is `title COLLATE NOCASE ASC, id ASC`.
//! - Every count mirrors the FROM/JOIN/WHERE clause of its find.

use crate::model::author::AuthorId;
use crate::model::book::{Book, BookDraft, BookId};
use crate::model::category::CategoryId;
use crate::model::now_millis;
use crate::repo::author_repo::load_book_authors;
use crate::repo::category_repo::load_book_categories;
use crate::repo::{
    count_rows, ensure_connection_ready, like_pattern, timestamp_column, RepoError, RepoResult,
};
use log::{debug, error, warn};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Params, Row, Transaction,
    TransactionBehavior,
};

const BOOK_COLUMNS: &str = "b.id AS id,
    b.title AS title,
    b.isbn AS isbn,
    b.published_year AS published_year,
    b.publisher AS publisher,
    b.pages AS pages,
    b.created_at AS created_at,
    b.updated_at AS updated_at";
const BOOK_ORDER: &str = "ORDER BY b.title COLLATE NOCASE ASC, b.id ASC";

const FROM_ALL: &str = "FROM book b";
const FROM_BY_AUTHOR: &str = "FROM book b
    INNER JOIN book_author ba ON ba.book_id = b.id
    WHERE ba.author_id = ?1";
const FROM_BY_CATEGORY: &str = "FROM book b
    INNER JOIN book_category bc ON bc.book_id = b.id
    WHERE bc.category_id = ?1";
const FROM_BY_TITLE: &str = "FROM book b WHERE b.title LIKE ?1 ESCAPE '\\'";

/// How association lookups that fail during a book read are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrichmentPolicy {
    /// A failed author/category lookup yields an empty list and a `warn`
    /// event; the book itself is still returned.
    #[default]
    BestEffort,
    /// A failed author/category lookup fails the whole read.
    Strict,
}

/// Store interface for books and their associations.
pub trait BookRepository {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Book>>;
    fn find_by_id(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn find_by_isbn(&self, isbn: &str) -> RepoResult<Option<Book>>;
    fn find_by_author_id(
        &self,
        author_id: AuthorId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Book>>;
    fn find_by_category_id(
        &self,
        category_id: CategoryId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Book>>;
    /// Case-insensitive substring match on title.
    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Book>>;
    /// Inserts the book and its associations atomically.
    fn create(
        &self,
        draft: &BookDraft,
        author_ids: &[AuthorId],
        category_ids: &[CategoryId],
    ) -> RepoResult<Book>;
    /// Replaces scalar fields; associations are left untouched.
    fn update(&self, id: BookId, draft: &BookDraft) -> RepoResult<Book>;
    /// Replaces the full author list; order follows `author_ids`.
    fn update_authors(&self, book_id: BookId, author_ids: &[AuthorId]) -> RepoResult<()>;
    /// Replaces the full category set.
    fn update_categories(&self, book_id: BookId, category_ids: &[CategoryId]) -> RepoResult<()>;
    /// Deletes the book; quotes and association rows go by cascade.
    fn delete(&self, id: BookId) -> RepoResult<()>;
    fn exists(&self, id: BookId) -> RepoResult<bool>;
    fn count(&self) -> RepoResult<u64>;
    fn count_search(&self, term: &str) -> RepoResult<u64>;
    fn count_by_author_id(&self, author_id: AuthorId) -> RepoResult<u64>;
    fn count_by_category_id(&self, category_id: CategoryId) -> RepoResult<u64>;
}

/// SQLite-backed book store.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
    enrichment: EnrichmentPolicy,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Creates the store over a migrated connection with best-effort
    /// enrichment.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["book", "author", "category", "book_author", "book_category"],
        )?;
        Ok(Self {
            conn,
            enrichment: EnrichmentPolicy::default(),
        })
    }

    pub fn with_enrichment(mut self, policy: EnrichmentPolicy) -> Self {
        self.enrichment = policy;
        self
    }

    pub fn enrichment(&self) -> EnrichmentPolicy {
        self.enrichment
    }

    fn query_books<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        drop(rows);

        books.into_iter().map(|book| self.enrich(book)).collect()
    }

    fn first_book<P: Params>(&self, sql: &str, params: P) -> RepoResult<Option<Book>> {
        Ok(self.query_books(sql, params)?.into_iter().next())
    }

    fn page(
        &self,
        from: &str,
        filter: Option<Value>,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Book>> {
        let mut bind_values: Vec<Value> = filter.into_iter().collect();
        let limit_slot = bind_values.len() + 1;
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(i64::from(offset)));

        self.query_books(
            &format!(
                "SELECT {BOOK_COLUMNS} {from} {BOOK_ORDER} LIMIT ?{limit_slot} OFFSET ?{};",
                limit_slot + 1
            ),
            params_from_iter(bind_values),
        )
    }

    fn enrich(&self, mut book: Book) -> RepoResult<Book> {
        book.authors = self.resolve(book.id, "authors", load_book_authors(self.conn, book.id))?;
        book.categories =
            self.resolve(book.id, "categories", load_book_categories(self.conn, book.id))?;
        Ok(book)
    }

    fn resolve<T>(
        &self,
        book_id: BookId,
        association: &str,
        loaded: RepoResult<Vec<T>>,
    ) -> RepoResult<Vec<T>> {
        match (loaded, self.enrichment) {
            (Ok(items), _) => Ok(items),
            (Err(err), EnrichmentPolicy::Strict) => Err(err),
            (Err(err), EnrichmentPolicy::BestEffort) => {
                warn!(
                    "event=book_enrich module=repo status=degraded book_id={book_id} association={association} error={err}"
                );
                Ok(Vec::new())
            }
        }
    }

    fn reload(&self, id: BookId) -> RepoResult<Book> {
        self.find_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("book {id} missing in read-back")))
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn insert_book(
        &self,
        draft: &BookDraft,
        author_ids: &[AuthorId],
        category_ids: &[CategoryId],
    ) -> RepoResult<BookId> {
        let tx = self.begin()?;
        let now = now_millis();
        tx.execute(
            "INSERT INTO book (
                title,
                isbn,
                published_year,
                publisher,
                pages,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
            params![
                draft.title,
                draft.isbn,
                draft.published_year,
                draft.publisher,
                draft.pages,
                now,
            ],
        )?;
        let book_id = tx.last_insert_rowid();

        insert_authors(&tx, book_id, author_ids)?;
        insert_categories(&tx, book_id, category_ids)?;

        tx.commit()?;
        Ok(book_id)
    }

    fn replace_associations(
        &self,
        book_id: BookId,
        table: &'static str,
        write: impl FnOnce(&Transaction<'_>) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let tx = self.begin()?;
        if !book_exists(&tx, book_id)? {
            return Err(RepoError::NotFound {
                entity: "book",
                id: book_id,
            });
        }

        tx.execute(&format!("DELETE FROM {table} WHERE book_id = ?1;"), [book_id])?;
        write(&tx)?;
        tx.execute(
            "UPDATE book SET updated_at = ?1 WHERE id = ?2;",
            params![now_millis(), book_id],
        )?;

        tx.commit()?;
        Ok(())
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Book>> {
        self.page(FROM_ALL, None, limit, offset)
    }

    fn find_by_id(&self, id: BookId) -> RepoResult<Option<Book>> {
        self.first_book(
            &format!("SELECT {BOOK_COLUMNS} FROM book b WHERE b.id = ?1;"),
            [id],
        )
    }

    fn find_by_isbn(&self, isbn: &str) -> RepoResult<Option<Book>> {
        self.first_book(
            &format!("SELECT {BOOK_COLUMNS} FROM book b WHERE b.isbn = ?1 LIMIT 1;"),
            [isbn],
        )
    }

    fn find_by_author_id(
        &self,
        author_id: AuthorId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Book>> {
        self.page(FROM_BY_AUTHOR, Some(Value::Integer(author_id)), limit, offset)
    }

    fn find_by_category_id(
        &self,
        category_id: CategoryId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Book>> {
        self.page(
            FROM_BY_CATEGORY,
            Some(Value::Integer(category_id)),
            limit,
            offset,
        )
    }

    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Book>> {
        self.page(
            FROM_BY_TITLE,
            Some(Value::Text(like_pattern(term))),
            limit,
            offset,
        )
    }

    fn create(
        &self,
        draft: &BookDraft,
        author_ids: &[AuthorId],
        category_ids: &[CategoryId],
    ) -> RepoResult<Book> {
        let book_id = self
            .insert_book(draft, author_ids, category_ids)
            .map_err(|err| {
                error!(
                    "event=book_create module=repo status=error authors={} categories={} error={err}",
                    author_ids.len(),
                    category_ids.len()
                );
                err
            })?;
        debug!(
            "event=book_create module=repo status=ok book_id={book_id} authors={} categories={}",
            author_ids.len(),
            category_ids.len()
        );
        self.reload(book_id)
    }

    fn update(&self, id: BookId, draft: &BookDraft) -> RepoResult<Book> {
        let changed = self.conn.execute(
            "UPDATE book
             SET
                title = ?1,
                isbn = ?2,
                published_year = ?3,
                publisher = ?4,
                pages = ?5,
                updated_at = ?6
             WHERE id = ?7;",
            params![
                draft.title,
                draft.isbn,
                draft.published_year,
                draft.publisher,
                draft.pages,
                now_millis(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "book", id });
        }
        debug!("event=book_update module=repo status=ok book_id={id}");
        self.reload(id)
    }

    fn update_authors(&self, book_id: BookId, author_ids: &[AuthorId]) -> RepoResult<()> {
        self.replace_associations(book_id, "book_author", |tx| {
            insert_authors(tx, book_id, author_ids)
        })
        .map_err(|err| {
            error!("event=book_set_authors module=repo status=error book_id={book_id} error={err}");
            err
        })?;
        debug!(
            "event=book_set_authors module=repo status=ok book_id={book_id} authors={}",
            author_ids.len()
        );
        Ok(())
    }

    fn update_categories(&self, book_id: BookId, category_ids: &[CategoryId]) -> RepoResult<()> {
        self.replace_associations(book_id, "book_category", |tx| {
            insert_categories(tx, book_id, category_ids)
        })
        .map_err(|err| {
            error!(
                "event=book_set_categories module=repo status=error book_id={book_id} error={err}"
            );
            err
        })?;
        debug!(
            "event=book_set_categories module=repo status=ok book_id={book_id} categories={}",
            category_ids.len()
        );
        Ok(())
    }

    fn delete(&self, id: BookId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM book WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "book", id });
        }
        debug!("event=book_delete module=repo status=ok book_id={id}");
        Ok(())
    }

    fn exists(&self, id: BookId) -> RepoResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM book WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, &format!("SELECT COUNT(*) {FROM_ALL};"), [])
    }

    fn count_search(&self, term: &str) -> RepoResult<u64> {
        count_rows(
            self.conn,
            &format!("SELECT COUNT(*) {FROM_BY_TITLE};"),
            [like_pattern(term)],
        )
    }

    fn count_by_author_id(&self, author_id: AuthorId) -> RepoResult<u64> {
        count_rows(
            self.conn,
            &format!("SELECT COUNT(*) {FROM_BY_AUTHOR};"),
            [author_id],
        )
    }

    fn count_by_category_id(&self, category_id: CategoryId) -> RepoResult<u64> {
        count_rows(
            self.conn,
            &format!("SELECT COUNT(*) {FROM_BY_CATEGORY};"),
            [category_id],
        )
    }
}

fn insert_authors(tx: &Transaction<'_>, book_id: BookId, author_ids: &[AuthorId]) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO book_author (book_id, author_id, \"order\") VALUES (?1, ?2, ?3);",
    )?;
    for (position, author_id) in author_ids.iter().enumerate() {
        let order = i64::try_from(position + 1)
            .map_err(|_| RepoError::InvalidData(format!("author position {position} overflows")))?;
        stmt.execute(params![book_id, author_id, order])?;
    }
    Ok(())
}

fn insert_categories(
    tx: &Transaction<'_>,
    book_id: BookId,
    category_ids: &[CategoryId],
) -> RepoResult<()> {
    let mut stmt =
        tx.prepare("INSERT INTO book_category (book_id, category_id) VALUES (?1, ?2);")?;
    for category_id in category_ids {
        stmt.execute(params![book_id, category_id])?;
    }
    Ok(())
}

fn book_exists(tx: &Transaction<'_>, book_id: BookId) -> RepoResult<bool> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM book WHERE id = ?1);",
        [book_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        isbn: row.get("isbn")?,
        published_year: row.get("published_year")?,
        publisher: row.get("publisher")?,
        pages: row.get("pages")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
        authors: Vec::new(),
        categories: Vec::new(),
    })
}
