//! Category domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned category identifier.
pub type CategoryId = i64;

/// Persisted category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Unique across categories, compared case-insensitively.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write-side input for category create/update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
