//! Catalog use-case services.
//!
//! # Responsibility
//! - Clamp pagination, trim and validate input before it reaches a store.
//! - Enforce the cross-entity rules the schema cannot express alone:
//!   duplicate names, referenced ids, guarded deletes.
//! - Pair every paged list with the total of the count that mirrors it.
//!
//! # Invariants
//! - Services never open transactions; atomic writes belong to the stores.
//! - Every id argument must be positive, otherwise `InvalidInput`.

pub mod author_service;
pub mod book_service;
pub mod category_service;
pub mod quote_service;

use crate::repo::RepoError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Page size used when the caller passes none, zero, a negative value or
/// more than the cap.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{9}[0-9X]|[0-9]{13})$").expect("valid isbn regex"));

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by every catalog service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input failed trimming/validation; the message names the field.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    /// A uniqueness or "still referenced" rule rejected the operation.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    Repo(#[source] RepoError),
    /// A write succeeded but its read-back did not match.
    #[error("inconsistent catalog state: {0}")]
    InconsistentState(&'static str),
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                key: id.to_string(),
            },
            other => Self::Repo(other),
        }
    }
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Turns a unique-index rejection lost to a concurrent writer into a
/// `Conflict`; other failures pass through.
pub(crate) fn name_conflict(err: RepoError) -> ServiceError {
    if err.is_constraint_violation() {
        ServiceError::Conflict(format!("name already taken: {err}"))
    } else {
        ServiceError::from(err)
    }
}

/// One page of results plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    /// Rows matching the same query without pagination.
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Clamps caller-supplied paging to store bounds.
///
/// `limit <= 0` or `limit > 100` becomes 100; a negative `offset` becomes 0.
pub fn normalize_page(limit: i64, offset: i64) -> (u32, u32) {
    let limit = match u32::try_from(limit) {
        Ok(value) if value > 0 && value <= DEFAULT_PAGE_LIMIT => value,
        _ => DEFAULT_PAGE_LIMIT,
    };
    let offset = u32::try_from(offset.max(0)).unwrap_or(u32::MAX);
    (limit, offset)
}

pub(crate) fn require_id(entity: &'static str, id: i64) -> ServiceResult<()> {
    if id <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "{entity} id must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Trims `value` and checks its character length lies in `min..=max`.
pub(crate) fn trimmed_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> ServiceResult<String> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length < min || length > max {
        return Err(ServiceError::InvalidInput(format!(
            "{field} must be {min}..={max} characters, got {length}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional free-text field; empty after trimming becomes `None`.
pub(crate) fn trimmed_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Validates an ISBN and returns its canonical form: separators (`-` and
/// spaces) removed, a trailing check character `x` upper-cased.
///
/// Storing only the canonical form lets the unique ISBN index see
/// `978-0-261-10357-3` and `9780261103573` as the same value.
pub(crate) fn normalize_isbn(value: Option<&str>) -> ServiceResult<Option<String>> {
    let Some(isbn) = trimmed_optional(value) else {
        return Ok(None);
    };
    let canonical: String = isbn
        .chars()
        .filter(|ch| !matches!(ch, '-' | ' '))
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if !ISBN_RE.is_match(&canonical) {
        return Err(ServiceError::InvalidInput(format!(
            "isbn must have 10 or 13 digits, got `{isbn}`"
        )));
    }
    Ok(Some(canonical))
}

#[cfg(test)]
mod tests {
    use super::{
        name_conflict, normalize_isbn, normalize_page, trimmed_optional, trimmed_text,
        ServiceError,
    };
    use crate::db::{open_db_in_memory, DbError};
    use crate::repo::RepoError;

    #[test]
    fn normalize_page_clamps_limit_and_offset() {
        assert_eq!(normalize_page(0, 0), (100, 0));
        assert_eq!(normalize_page(-5, -1), (100, 0));
        assert_eq!(normalize_page(101, 7), (100, 7));
        assert_eq!(normalize_page(100, 0), (100, 0));
        assert_eq!(normalize_page(1, 3), (1, 3));
        assert_eq!(normalize_page(i64::MAX, i64::MAX), (100, u32::MAX));
    }

    #[test]
    fn trimmed_text_counts_characters_not_bytes() {
        assert_eq!(trimmed_text("name", "  Éa ", 2, 3).unwrap(), "Éa");
        assert!(matches!(
            trimmed_text("name", " a ", 2, 200),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn trimmed_optional_drops_blank_values() {
        assert_eq!(trimmed_optional(Some("   ")), None);
        assert_eq!(trimmed_optional(Some(" Penguin ")), Some("Penguin".to_string()));
        assert_eq!(trimmed_optional(None), None);
    }

    #[test]
    fn normalize_isbn_strips_separators_into_canonical_form() {
        assert_eq!(
            normalize_isbn(Some(" 978-0-261-10357-3 ")).unwrap(),
            Some("9780261103573".to_string())
        );
        assert_eq!(
            normalize_isbn(Some("0 261 10357 x")).unwrap(),
            Some("026110357X".to_string())
        );
        assert_eq!(
            normalize_isbn(Some("978-0-261-10357-3")).unwrap(),
            normalize_isbn(Some("9780261103573")).unwrap()
        );
        assert_eq!(normalize_isbn(Some("  ")).unwrap(), None);
    }

    #[test]
    fn normalize_isbn_rejects_wrong_length_or_letters() {
        assert!(normalize_isbn(Some("12345")).is_err());
        assert!(normalize_isbn(Some("978026110357A")).is_err());
    }

    #[test]
    fn repo_not_found_maps_to_service_not_found() {
        let mapped = ServiceError::from(RepoError::NotFound {
            entity: "book",
            id: 9,
        });
        assert!(matches!(
            mapped,
            ServiceError::NotFound { entity: "book", ref key } if key == "9"
        ));
    }

    #[test]
    fn name_conflict_maps_unique_violations_only() {
        let conn = open_db_in_memory().unwrap();
        let insert = "INSERT INTO category (name, created_at, updated_at) VALUES (?1, 0, 0)";
        conn.execute(insert, ["Poetry"]).unwrap();
        let sqlite_err = conn.execute(insert, ["POETRY"]).unwrap_err();
        let violation = RepoError::Db(DbError::Sqlite(sqlite_err));
        assert!(matches!(
            name_conflict(violation),
            ServiceError::Conflict(_)
        ));

        let missing = RepoError::NotFound {
            entity: "category",
            id: 4,
        };
        assert!(matches!(
            name_conflict(missing),
            ServiceError::NotFound {
                entity: "category",
                ..
            }
        ));
    }
}
