//! Core of the quotebook catalog: authors, books, categories and quotes
//! over a normalized SQLite schema.
//! Stores own atomicity and query composition; services own validation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CatalogConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::author::{Author, AuthorDraft, AuthorId};
pub use model::book::{Book, BookAuthor, BookDraft, BookId, BookSummary};
pub use model::category::{Category, CategoryDraft, CategoryId};
pub use model::quote::{Quote, QuoteDraft, QuoteFilter, QuoteId};
pub use repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use repo::book_repo::{BookRepository, EnrichmentPolicy, SqliteBookRepository};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::quote_repo::{QuoteRepository, SqliteQuoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::author_service::AuthorService;
pub use service::book_service::BookService;
pub use service::category_service::CategoryService;
pub use service::quote_service::QuoteService;
pub use service::{normalize_page, Paged, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
