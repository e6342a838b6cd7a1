//! Category store contract and SQLite implementation.
//!
//! # Invariants
//! - Listing and search order is `name COLLATE NOCASE ASC, id ASC`.
//! - Category names are unique case-insensitively at the schema level,
//!   folding ASCII letters only (`NOCASE`).

use crate::model::book::BookId;
use crate::model::category::{Category, CategoryDraft, CategoryId};
use crate::model::now_millis;
use crate::repo::{
    count_rows, ensure_connection_ready, like_pattern, timestamp_column, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

const CATEGORY_COLUMNS: &str =
    "c.id AS id, c.name AS name, c.created_at AS created_at, c.updated_at AS updated_at";
const CATEGORY_ORDER: &str = "ORDER BY c.name COLLATE NOCASE ASC, c.id ASC";

/// Store interface for categories.
pub trait CategoryRepository {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Category>>;
    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    fn find_by_book_id(&self, book_id: BookId) -> RepoResult<Vec<Category>>;
    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Category>>;
    fn create(&self, draft: &CategoryDraft) -> RepoResult<Category>;
    fn update(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category>;
    fn delete(&self, id: CategoryId) -> RepoResult<()>;
    fn exists(&self, id: CategoryId) -> RepoResult<bool>;
    fn count(&self) -> RepoResult<u64>;
    fn count_search(&self, term: &str) -> RepoResult<u64>;
}

/// SQLite-backed category store.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates the store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["category", "book_category"])?;
        Ok(Self { conn })
    }

    fn query_categories<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Category>> {
        collect_categories(self.conn, sql, params)
    }

    fn first_category<P: Params>(&self, sql: &str, params: P) -> RepoResult<Option<Category>> {
        Ok(self.query_categories(sql, params)?.into_iter().next())
    }

    fn reload(&self, id: CategoryId) -> RepoResult<Category> {
        self.find_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("category {id} missing in read-back")))
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn find_all(&self, limit: u32, offset: u32) -> RepoResult<Vec<Category>> {
        self.query_categories(
            &format!(
                "SELECT {CATEGORY_COLUMNS} FROM category c {CATEGORY_ORDER} LIMIT ?1 OFFSET ?2;"
            ),
            params![limit, offset],
        )
    }

    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        self.first_category(
            &format!("SELECT {CATEGORY_COLUMNS} FROM category c WHERE c.id = ?1;"),
            [id],
        )
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        self.first_category(
            &format!(
                "SELECT {CATEGORY_COLUMNS}
                 FROM category c
                 WHERE c.name = ?1 COLLATE NOCASE
                 LIMIT 1;"
            ),
            [name],
        )
    }

    fn find_by_book_id(&self, book_id: BookId) -> RepoResult<Vec<Category>> {
        load_book_categories(self.conn, book_id)
    }

    fn search(&self, term: &str, limit: u32, offset: u32) -> RepoResult<Vec<Category>> {
        self.query_categories(
            &format!(
                "SELECT {CATEGORY_COLUMNS}
                 FROM category c
                 WHERE c.name LIKE ?1 ESCAPE '\\'
                 {CATEGORY_ORDER}
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![like_pattern(term), limit, offset],
        )
    }

    fn create(&self, draft: &CategoryDraft) -> RepoResult<Category> {
        self.conn.execute(
            "INSERT INTO category (name, created_at, updated_at) VALUES (?1, ?2, ?2);",
            params![draft.name, now_millis()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("event=category_create module=repo status=ok category_id={id}");
        self.reload(id)
    }

    fn update(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category> {
        let changed = self.conn.execute(
            "UPDATE category SET name = ?1, updated_at = ?2 WHERE id = ?3;",
            params![draft.name, now_millis(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        debug!("event=category_update module=repo status=ok category_id={id}");
        self.reload(id)
    }

    fn delete(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM category WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        debug!("event=category_delete module=repo status=ok category_id={id}");
        Ok(())
    }

    fn exists(&self, id: CategoryId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM category WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM category;", [])
    }

    fn count_search(&self, term: &str) -> RepoResult<u64> {
        count_rows(
            self.conn,
            "SELECT COUNT(*) FROM category c WHERE c.name LIKE ?1 ESCAPE '\\';",
            [like_pattern(term)],
        )
    }
}

/// Loads the categories of one book, sorted by name.
pub(crate) fn load_book_categories(conn: &Connection, book_id: BookId) -> RepoResult<Vec<Category>> {
    collect_categories(
        conn,
        &format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM category c
             INNER JOIN book_category bc ON bc.category_id = c.id
             WHERE bc.book_id = ?1
             {CATEGORY_ORDER};"
        ),
        [book_id],
    )
}

fn collect_categories<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        categories.push(parse_category_row(row)?);
    }
    Ok(categories)
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
