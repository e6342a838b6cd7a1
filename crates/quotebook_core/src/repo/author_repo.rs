//! Author store contract and SQLite implementation.
//!
//! # Invariants
//! - Listing and search order is `name COLLATE NOCASE ASC, id ASC`.
//! - `find_by_name` is an exact, case-insensitive match.
//! - Case folding is SQLite `NOCASE`, which folds ASCII letters only:
//!   "Émile" and "émile" are distinct names for lookup and uniqueness.
//! - `delete` is unconditional; the "still referenced" guard belongs to
//!   the service layer.

use crate::model::author::{Author, AuthorDraft, AuthorId};
use crate::model::book::{BookAuthor, BookId};
use crate::model::now_millis;
use crate::repo::{
    count_rows, ensure_connection_ready, like_pattern, timestamp_column, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const AUTHOR_COLUMNS: &str =
    "a.id AS id, a.name AS name, a.created_at AS created_at, a.updated_at AS updated_at";
const AUTHOR_ORDER: &str = "ORDER BY a.name COLLATE NOCASE ASC, a.id ASC";

/// Store interface for authors.
pub trait AuthorRepository {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Author>>;
    fn find_by_id(&self, id: AuthorId) -> RepoResult<Option<Author>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Author>>;
    /// Authors of one book, in authorship order.
    fn find_by_book_id(&self, book_id: BookId) -> RepoResult<Vec<BookAuthor>>;
    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Author>>;
    fn create(&self, draft: &AuthorDraft) -> RepoResult<Author>;
    fn update(&self, id: AuthorId, draft: &AuthorDraft) -> RepoResult<Author>;
    fn delete(&self, id: AuthorId) -> RepoResult<()>;
    fn exists(&self, id: AuthorId) -> RepoResult<bool>;
    fn count(&self) -> RepoResult<u64>;
    /// Number of rows `search(term, ..)` can page through.
    fn count_search(&self, term: &str) -> RepoResult<u64>;
}

/// SQLite-backed author store.
pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    /// Creates the store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["author", "book_author"])?;
        Ok(Self { conn })
    }

    fn query_authors(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Author>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut authors = Vec::new();
        while let Some(row) = rows.next()? {
            authors.push(parse_author_row(row)?);
        }
        Ok(authors)
    }

    fn reload(&self, id: AuthorId) -> RepoResult<Author> {
        self.find_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("author {id} missing in read-back")))
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Author>> {
        self.query_authors(
            &format!("SELECT {AUTHOR_COLUMNS} FROM author a {AUTHOR_ORDER} LIMIT ?1 OFFSET ?2;"),
            params![limit, offset],
        )
    }

    fn find_by_id(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {AUTHOR_COLUMNS} FROM author a WHERE a.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_author_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Author>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUTHOR_COLUMNS}
             FROM author a
             WHERE a.name = ?1 COLLATE NOCASE
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_author_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_book_id(&self, book_id: BookId) -> RepoResult<Vec<BookAuthor>> {
        load_book_authors(self.conn, book_id)
    }

    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Author>> {
        self.query_authors(
            &format!(
                "SELECT {AUTHOR_COLUMNS}
                 FROM author a
                 WHERE a.name LIKE ?1 ESCAPE '\\'
                 {AUTHOR_ORDER}
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![like_pattern(term), limit, offset],
        )
    }

    fn create(&self, draft: &AuthorDraft) -> RepoResult<Author> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO author (name, created_at, updated_at) VALUES (?1, ?2, ?2);",
            params![draft.name, now],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("event=author_create module=repo status=ok author_id={id}");
        self.reload(id)
    }

    fn update(&self, id: AuthorId, draft: &AuthorDraft) -> RepoResult<Author> {
        let changed = self.conn.execute(
            "UPDATE author SET name = ?1, updated_at = ?2 WHERE id = ?3;",
            params![draft.name, now_millis(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "author",
                id,
            });
        }
        debug!("event=author_update module=repo status=ok author_id={id}");
        self.reload(id)
    }

    fn delete(&self, id: AuthorId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM author WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "author",
                id,
            });
        }
        debug!("event=author_delete module=repo status=ok author_id={id}");
        Ok(())
    }

    fn exists(&self, id: AuthorId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM author WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM author;", [])
    }

    fn count_search(&self, term: &str) -> RepoResult<u64> {
        count_rows(
            self.conn,
            "SELECT COUNT(*) FROM author a WHERE a.name LIKE ?1 ESCAPE '\\';",
            [like_pattern(term)],
        )
    }
}

/// Loads the ordered author list of one book.
pub(crate) fn load_book_authors(conn: &Connection, book_id: BookId) -> RepoResult<Vec<BookAuthor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AUTHOR_COLUMNS}, ba.\"order\" AS author_order
         FROM author a
         INNER JOIN book_author ba ON ba.author_id = a.id
         WHERE ba.book_id = ?1
         ORDER BY ba.\"order\" ASC, a.id ASC;"
    ))?;
    let mut rows = stmt.query([book_id])?;
    let mut authors = Vec::new();
    while let Some(row) = rows.next()? {
        authors.push(BookAuthor {
            author: parse_author_row(row)?,
            order: row.get("author_order")?,
        });
    }
    Ok(authors)
}

fn parse_author_row(row: &Row<'_>) -> RepoResult<Author> {
    Ok(Author {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
