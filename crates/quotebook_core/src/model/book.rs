//! Book domain model and its association projections.
//!
//! # Invariants
//! - `Book::authors` is sorted by `order` ascending.
//! - `order` values start at 1 and follow the list passed on the last
//!   create or author replacement.

use crate::model::author::{Author, AuthorId};
use crate::model::category::{Category, CategoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned book identifier.
pub type BookId = i64;

/// One author of a book together with its authorship position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAuthor {
    #[serde(flatten)]
    pub author: Author,
    /// 1-based authorship position.
    pub order: i64,
}

/// Persisted book with its resolved associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Unique across books when present and non-empty.
    pub isbn: Option<String>,
    /// Range `0..=9999`, enforced by a schema check.
    pub published_year: i32,
    pub publisher: Option<String>,
    pub pages: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub authors: Vec<BookAuthor>,
    pub categories: Vec<Category>,
}

impl Book {
    /// Author ids in authorship order.
    pub fn author_ids(&self) -> Vec<AuthorId> {
        self.authors.iter().map(|entry| entry.author.id).collect()
    }

    /// Category ids in the order they were loaded (by name).
    pub fn category_ids(&self) -> Vec<CategoryId> {
        self.categories.iter().map(|category| category.id).collect()
    }
}

/// Book scalar fields embedded in quote reads, without associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub isbn: Option<String>,
    pub published_year: i32,
    pub publisher: Option<String>,
    pub pages: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar fields accepted by book create/update.
///
/// Update is a full replace of these fields; associations are replaced
/// through dedicated operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub isbn: Option<String>,
    pub published_year: i32,
    pub publisher: Option<String>,
    pub pages: i32,
}

impl BookDraft {
    pub fn new(title: impl Into<String>, published_year: i32) -> Self {
        Self {
            title: title.into(),
            published_year,
            ..Self::default()
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_pages(mut self, pages: i32) -> Self {
        self.pages = pages;
        self
    }
}
