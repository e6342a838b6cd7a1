//! Catalog stores over the shared SQLite connection.
//!
//! # Responsibility
//! - Map authors, categories, books and quotes onto the normalized schema.
//! - Run multi-statement writes inside one transaction.
//! - Compose filtered read queries across the association tables.
//!
//! # Invariants
//! - Lookups by id/name/isbn return `Ok(None)` on absence; update/delete
//!   return `RepoError::NotFound` when no row was affected.
//! - Engine errors (unique, check, foreign key) are surfaced unchanged
//!   through `RepoError::Db`.
//! - Stores never clamp pagination; callers pass final bounds.

pub mod author_repo;
pub mod book_repo;
pub mod category_repo;
pub mod quote_repo;

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::millis_to_datetime;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, Params, Row};

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error shared by every catalog repository.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("catalog store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("catalog store requires table `{0}`")]
    MissingRequiredTable(&'static str),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Whether the engine rejected the write because of a UNIQUE, CHECK,
    /// NOT NULL or FOREIGN KEY constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::ConstraintViolation
        )
    }
}

/// Fails unless the connection is migrated to the latest version and has
/// every table in `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let actual_version = current_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// Builds a `LIKE ... ESCAPE '\'` substring pattern where `%`, `_` and `\`
/// in `term` match literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Reads an epoch-millisecond column as a UTC instant.
pub(crate) fn timestamp_column(row: &Row<'_>, column: &str) -> RepoResult<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    millis_to_datetime(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{millis}` out of range in `{column}`"))
    })
}

/// Runs a single-value `COUNT(...)` query.
pub(crate) fn count_rows<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<u64> {
    let count: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count `{count}`")))
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_wraps_plain_terms() {
        assert_eq!(like_pattern("tolkien"), "%tolkien%");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
