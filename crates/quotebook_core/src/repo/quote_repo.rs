//! Quote store contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over quotes, each read joined to its book summary.
//! - Compose filtered reads with joins added only for the filters in use.
//!
//! # Invariants
//! - Reads through association joins are `DISTINCT` on the quote, so a
//!   book with several matching authors/categories yields each quote once.
//! - Result order is `created_at DESC, id DESC`; pagination applies after.
//! - A count is built from the same FROM/JOIN/WHERE fragment as the find
//!   it reports a total for.

use crate::model::author::AuthorId;
use crate::model::book::{BookId, BookSummary};
use crate::model::category::CategoryId;
use crate::model::now_millis;
use crate::model::quote::{Quote, QuoteDraft, QuoteFilter, QuoteId};
use crate::repo::{
    count_rows, ensure_connection_ready, like_pattern, timestamp_column, RepoError, RepoResult,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const QUOTE_COLUMNS: &str = "q.id AS id,
    q.book_id AS book_id,
    q.text AS text,
    q.created_at AS created_at,
    q.updated_at AS updated_at,
    b.title AS book_title,
    b.isbn AS book_isbn,
    b.published_year AS book_published_year,
    b.publisher AS book_publisher,
    b.pages AS book_pages,
    b.created_at AS book_created_at,
    b.updated_at AS book_updated_at";
const QUOTE_ORDER: &str = "ORDER BY q.created_at DESC, q.id DESC";
const QUOTE_BASE_FROM: &str = "FROM quote q INNER JOIN book b ON b.id = q.book_id";

/// Store interface for quotes.
pub trait QuoteRepository {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Quote>>;
    fn find_by_id(&self, id: QuoteId) -> RepoResult<Option<Quote>>;
    /// Exact, case-insensitive text match; most recent first.
    fn find_by_text(&self, text: &str) -> RepoResult<Option<Quote>>;
    fn find_by_book_id(&self, book_id: BookId, limit: u32, offset: u32) -> RepoResult<Vec<Quote>>;
    fn find_by_author_id(
        &self,
        author_id: AuthorId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>>;
    fn find_by_category_id(
        &self,
        category_id: CategoryId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>>;
    /// ANDs every filter that is set; an empty filter lists everything.
    fn find_by_filters(
        &self,
        filter: &QuoteFilter,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>>;
    /// Uniformly sampled quote, `None` when there are no quotes.
    fn find_random(&self) -> RepoResult<Option<Quote>>;
    /// Substring match on quote text.
    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Quote>>;
    /// Substring match on quote text, book title or any author name.
    fn search_in_book_and_author(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>>;
    fn create(&self, draft: &QuoteDraft) -> RepoResult<Quote>;
    fn update(&self, id: QuoteId, draft: &QuoteDraft) -> RepoResult<Quote>;
    fn delete(&self, id: QuoteId) -> RepoResult<()>;
    fn exists(&self, id: QuoteId) -> RepoResult<bool>;
    fn count(&self) -> RepoResult<u64>;
    fn count_by_book_id(&self, book_id: BookId) -> RepoResult<u64>;
    fn count_by_author_id(&self, author_id: AuthorId) -> RepoResult<u64>;
    fn count_by_category_id(&self, category_id: CategoryId) -> RepoResult<u64>;
    fn count_by_filters(&self, filter: &QuoteFilter) -> RepoResult<u64>;
    fn count_search(&self, term: &str) -> RepoResult<u64>;
    fn count_search_in_book_and_author(&self, term: &str) -> RepoResult<u64>;
}

/// FROM/JOIN/WHERE fragment plus the values it binds, shared by a find and
/// its count.
#[derive(Debug, Clone, PartialEq)]
struct QuoteSource {
    from: String,
    bind_values: Vec<Value>,
}

impl QuoteSource {
    fn for_filter(filter: &QuoteFilter) -> Self {
        let mut from = String::from(QUOTE_BASE_FROM);
        let mut conditions: Vec<&str> = Vec::new();
        let mut bind_values = Vec::new();

        if let Some(author_id) = filter.author_id {
            from.push_str(" INNER JOIN book_author ba ON ba.book_id = b.id");
            conditions.push("ba.author_id = ?");
            bind_values.push(Value::Integer(author_id));
        }
        if let Some(category_id) = filter.category_id {
            from.push_str(" INNER JOIN book_category bc ON bc.book_id = b.id");
            conditions.push("bc.category_id = ?");
            bind_values.push(Value::Integer(category_id));
        }
        if let Some(book_id) = filter.book_id {
            conditions.push("q.book_id = ?");
            bind_values.push(Value::Integer(book_id));
        }

        if !conditions.is_empty() {
            from.push_str(" WHERE ");
            from.push_str(&conditions.join(" AND "));
        }

        Self { from, bind_values }
    }

    fn text_search(term: &str) -> Self {
        Self {
            from: format!("{QUOTE_BASE_FROM} WHERE q.text LIKE ? ESCAPE '\\'"),
            bind_values: vec![Value::Text(like_pattern(term))],
        }
    }

    fn book_and_author_search(term: &str) -> Self {
        let pattern = like_pattern(term);
        Self {
            from: format!(
                "{QUOTE_BASE_FROM}
                 LEFT JOIN book_author ba ON ba.book_id = b.id
                 LEFT JOIN author a ON a.id = ba.author_id
                 WHERE q.text LIKE ? ESCAPE '\\'
                    OR b.title LIKE ? ESCAPE '\\'
                    OR a.name LIKE ? ESCAPE '\\'"
            ),
            bind_values: vec![
                Value::Text(pattern.clone()),
                Value::Text(pattern.clone()),
                Value::Text(pattern),
            ],
        }
    }

    fn select_page_sql(&self) -> String {
        format!(
            "SELECT DISTINCT {QUOTE_COLUMNS} {} {QUOTE_ORDER} LIMIT ? OFFSET ?;",
            self.from
        )
    }

    fn count_sql(&self) -> String {
        format!("SELECT COUNT(DISTINCT q.id) {};", self.from)
    }
}

/// SQLite-backed quote store.
pub struct SqliteQuoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQuoteRepository<'conn> {
    /// Creates the store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["quote", "book", "author", "book_author", "book_category"],
        )?;
        Ok(Self { conn })
    }

    fn query_quotes(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Quote>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut quotes = Vec::new();
        while let Some(row) = rows.next()? {
            quotes.push(parse_quote_row(row)?);
        }
        Ok(quotes)
    }

    fn page(&self, source: QuoteSource, limit: u32, offset: u32) -> RepoResult<Vec<Quote>> {
        let sql = source.select_page_sql();
        let mut bind_values = source.bind_values;
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(i64::from(offset)));
        self.query_quotes(&sql, bind_values)
    }

    fn count_source(&self, source: QuoteSource) -> RepoResult<u64> {
        count_rows(
            self.conn,
            &source.count_sql(),
            params_from_iter(source.bind_values),
        )
    }

    fn first_quote(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Option<Quote>> {
        Ok(self.query_quotes(sql, bind_values)?.into_iter().next())
    }

    fn reload(&self, id: QuoteId) -> RepoResult<Quote> {
        self.find_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("quote {id} missing in read-back")))
    }
}

impl QuoteRepository for SqliteQuoteRepository<'_> {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Quote>> {
        self.find_by_filters(&QuoteFilter::default(), limit, offset)
    }

    fn find_by_id(&self, id: QuoteId) -> RepoResult<Option<Quote>> {
        self.first_quote(
            &format!("SELECT {QUOTE_COLUMNS} {QUOTE_BASE_FROM} WHERE q.id = ?1;"),
            vec![Value::Integer(id)],
        )
    }

    fn find_by_text(&self, text: &str) -> RepoResult<Option<Quote>> {
        self.first_quote(
            &format!(
                "SELECT {QUOTE_COLUMNS}
                 {QUOTE_BASE_FROM}
                 WHERE q.text = ?1 COLLATE NOCASE
                 {QUOTE_ORDER}
                 LIMIT 1;"
            ),
            vec![Value::Text(text.to_string())],
        )
    }

    fn find_by_book_id(&self, book_id: BookId, limit: u32, offset: u32) -> RepoResult<Vec<Quote>> {
        self.find_by_filters(&QuoteFilter::by_book(book_id), limit, offset)
    }

    fn find_by_author_id(
        &self,
        author_id: AuthorId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>> {
        self.find_by_filters(&QuoteFilter::by_author(author_id), limit, offset)
    }

    fn find_by_category_id(
        &self,
        category_id: CategoryId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>> {
        self.find_by_filters(&QuoteFilter::by_category(category_id), limit, offset)
    }

    fn find_by_filters(
        &self,
        filter: &QuoteFilter,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>> {
        self.page(QuoteSource::for_filter(filter), limit, offset)
    }

    fn find_random(&self) -> RepoResult<Option<Quote>> {
        self.first_quote(
            &format!("SELECT {QUOTE_COLUMNS} {QUOTE_BASE_FROM} ORDER BY RANDOM() LIMIT 1;"),
            Vec::new(),
        )
    }

    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Quote>> {
        self.page(QuoteSource::text_search(term), limit, offset)
    }

    fn search_in_book_and_author(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Quote>> {
        self.page(QuoteSource::book_and_author_search(term), limit, offset)
    }

    fn create(&self, draft: &QuoteDraft) -> RepoResult<Quote> {
        self.conn.execute(
            "INSERT INTO quote (book_id, text, created_at, updated_at) VALUES (?1, ?2, ?3, ?3);",
            params![draft.book_id, draft.text, now_millis()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(
            "event=quote_create module=repo status=ok quote_id={id} book_id={}",
            draft.book_id
        );
        self.reload(id)
    }

    fn update(&self, id: QuoteId, draft: &QuoteDraft) -> RepoResult<Quote> {
        let changed = self.conn.execute(
            "UPDATE quote SET book_id = ?1, text = ?2, updated_at = ?3 WHERE id = ?4;",
            params![draft.book_id, draft.text, now_millis(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "quote", id });
        }
        debug!("event=quote_update module=repo status=ok quote_id={id}");
        self.reload(id)
    }

    fn delete(&self, id: QuoteId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM quote WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "quote", id });
        }
        debug!("event=quote_delete module=repo status=ok quote_id={id}");
        Ok(())
    }

    fn exists(&self, id: QuoteId) -> RepoResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM quote WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM quote;", [])
    }

    fn count_by_book_id(&self, book_id: BookId) -> RepoResult<u64> {
        self.count_by_filters(&QuoteFilter::by_book(book_id))
    }

    fn count_by_author_id(&self, author_id: AuthorId) -> RepoResult<u64> {
        self.count_by_filters(&QuoteFilter::by_author(author_id))
    }

    fn count_by_category_id(&self, category_id: CategoryId) -> RepoResult<u64> {
        self.count_by_filters(&QuoteFilter::by_category(category_id))
    }

    fn count_by_filters(&self, filter: &QuoteFilter) -> RepoResult<u64> {
        self.count_source(QuoteSource::for_filter(filter))
    }

    fn count_search(&self, term: &str) -> RepoResult<u64> {
        self.count_source(QuoteSource::text_search(term))
    }

    fn count_search_in_book_and_author(&self, term: &str) -> RepoResult<u64> {
        self.count_source(QuoteSource::book_and_author_search(term))
    }
}

fn parse_quote_row(row: &Row<'_>) -> RepoResult<Quote> {
    let book_id: BookId = row.get("book_id")?;
    Ok(Quote {
        id: row.get("id")?,
        book_id,
        text: row.get("text")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
        book: BookSummary {
            id: book_id,
            title: row.get("book_title")?,
            isbn: row.get("book_isbn")?,
            published_year: row.get("book_published_year")?,
            publisher: row.get("book_publisher")?,
            pages: row.get("book_pages")?,
            created_at: timestamp_column(row, "book_created_at")?,
            updated_at: timestamp_column(row, "book_updated_at")?,
        },
    })
}
