//! Quote domain model.

use crate::model::author::AuthorId;
use crate::model::book::{BookId, BookSummary};
use crate::model::category::CategoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned quote identifier.
pub type QuoteId = i64;

/// Persisted quote together with the book it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub book_id: BookId,
    /// 1 to 5000 characters, enforced by a schema check.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub book: BookSummary,
}

/// Write-side input for quote create/update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub book_id: BookId,
    pub text: String,
}

impl QuoteDraft {
    pub fn new(book_id: BookId, text: impl Into<String>) -> Self {
        Self {
            book_id,
            text: text.into(),
        }
    }
}

/// Optional filters for quote listing; unset fields do not constrain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFilter {
    pub book_id: Option<BookId>,
    pub author_id: Option<AuthorId>,
    pub category_id: Option<CategoryId>,
}

impl QuoteFilter {
    pub fn by_book(book_id: BookId) -> Self {
        Self {
            book_id: Some(book_id),
            ..Self::default()
        }
    }

    pub fn by_author(author_id: AuthorId) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn by_category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }
}
