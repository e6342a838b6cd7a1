//! Book use-case service.
//!
//! # Responsibility
//! - Validate scalar book fields and normalize optional text.
//! - Check that referenced authors/categories exist before any write.
//! - Keep ISBNs unique across books.
//!
//! # Invariants
//! - A book is created with at least one author; `update_authors` keeps
//!   that true.
//! - Author/category id lists must not repeat an id.

use crate::model::author::AuthorId;
use crate::model::book::{Book, BookDraft, BookId};
use crate::model::category::CategoryId;
use crate::repo::author_repo::AuthorRepository;
use crate::repo::book_repo::BookRepository;
use crate::repo::category_repo::CategoryRepository;
use crate::service::{
    normalize_isbn, normalize_page, require_id, trimmed_optional, trimmed_text, Paged,
    ServiceError, ServiceResult,
};
use log::info;
use std::collections::HashSet;

const TITLE_MAX_CHARS: usize = 500;
const MAX_PUBLISHED_YEAR: i32 = 9999;

/// Book service facade over book, author and category stores.
pub struct BookService<B: BookRepository, A: AuthorRepository, C: CategoryRepository> {
    books: B,
    authors: A,
    categories: C,
}

impl<B, A, C> BookService<B, A, C>
where
    B: BookRepository,
    A: AuthorRepository,
    C: CategoryRepository,
{
    pub fn new(books: B, authors: A, categories: C) -> Self {
        Self {
            books,
            authors,
            categories,
        }
    }

    pub fn list(&self, limit: i64, offset: i64) -> ServiceResult<Paged<Book>> {
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.books.find_all(limit, offset)?,
            total: self.books.count()?,
            limit,
            offset,
        })
    }

    pub fn get(&self, id: BookId) -> ServiceResult<Book> {
        require_id("book", id)?;
        self.books
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::not_found("book", id))
    }

    /// Looks a book up by ISBN, with or without separators.
    pub fn get_by_isbn(&self, isbn: &str) -> ServiceResult<Book> {
        let Some(isbn) = normalize_isbn(Some(isbn))? else {
            return Err(ServiceError::InvalidInput("isbn cannot be empty".to_string()));
        };
        self.books
            .find_by_isbn(&isbn)?
            .ok_or_else(|| ServiceError::not_found("book", isbn))
    }

    /// Title search; a blank term lists every book.
    pub fn search(&self, term: &str, limit: i64, offset: i64) -> ServiceResult<Paged<Book>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(limit, offset);
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.books.search(term, limit, offset)?,
            total: self.books.count_search(term)?,
            limit,
            offset,
        })
    }

    pub fn list_by_author(
        &self,
        author_id: AuthorId,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Book>> {
        require_id("author", author_id)?;
        if !self.authors.exists(author_id)? {
            return Err(ServiceError::not_found("author", author_id));
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.books.find_by_author_id(author_id, limit, offset)?,
            total: self.books.count_by_author_id(author_id)?,
            limit,
            offset,
        })
    }

    pub fn list_by_category(
        &self,
        category_id: CategoryId,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Book>> {
        require_id("category", category_id)?;
        if !self.categories.exists(category_id)? {
            return Err(ServiceError::not_found("category", category_id));
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.books.find_by_category_id(category_id, limit, offset)?,
            total: self.books.count_by_category_id(category_id)?,
            limit,
            offset,
        })
    }

    pub fn create(
        &self,
        draft: &BookDraft,
        author_ids: &[AuthorId],
        category_ids: &[CategoryId],
    ) -> ServiceResult<Book> {
        let draft = validate_draft(draft)?;
        self.ensure_isbn_free(draft.isbn.as_deref(), None)?;
        self.ensure_authors(author_ids)?;
        self.ensure_categories(category_ids)?;

        let book = self.books.create(&draft, author_ids, category_ids)?;
        info!(
            "event=book_create module=service status=ok book_id={} authors={} categories={}",
            book.id,
            author_ids.len(),
            category_ids.len()
        );
        Ok(book)
    }

    /// Replaces scalar fields; associations are kept.
    pub fn update(&self, id: BookId, draft: &BookDraft) -> ServiceResult<Book> {
        require_id("book", id)?;
        let draft = validate_draft(draft)?;
        if !self.books.exists(id)? {
            return Err(ServiceError::not_found("book", id));
        }
        self.ensure_isbn_free(draft.isbn.as_deref(), Some(id))?;
        Ok(self.books.update(id, &draft)?)
    }

    /// Replaces the author list; position in `author_ids` becomes `order`.
    pub fn update_authors(&self, book_id: BookId, author_ids: &[AuthorId]) -> ServiceResult<Book> {
        require_id("book", book_id)?;
        if !self.books.exists(book_id)? {
            return Err(ServiceError::not_found("book", book_id));
        }
        self.ensure_authors(author_ids)?;
        self.books.update_authors(book_id, author_ids)?;
        self.reload(book_id, "book missing after author replacement")
    }

    /// Replaces the category set; an empty list clears it.
    pub fn update_categories(
        &self,
        book_id: BookId,
        category_ids: &[CategoryId],
    ) -> ServiceResult<Book> {
        require_id("book", book_id)?;
        if !self.books.exists(book_id)? {
            return Err(ServiceError::not_found("book", book_id));
        }
        self.ensure_categories(category_ids)?;
        self.books.update_categories(book_id, category_ids)?;
        self.reload(book_id, "book missing after category replacement")
    }

    /// Deletes the book together with its quotes and associations.
    pub fn delete(&self, id: BookId) -> ServiceResult<()> {
        require_id("book", id)?;
        self.books.delete(id)?;
        info!("event=book_delete module=service status=ok book_id={id}");
        Ok(())
    }

    fn reload(&self, id: BookId, details: &'static str) -> ServiceResult<Book> {
        self.books
            .find_by_id(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }

    fn ensure_isbn_free(&self, isbn: Option<&str>, owner: Option<BookId>) -> ServiceResult<()> {
        let Some(isbn) = isbn else {
            return Ok(());
        };
        match self.books.find_by_isbn(isbn)? {
            Some(existing) if Some(existing.id) != owner => Err(ServiceError::Conflict(format!(
                "isbn `{isbn}` already belongs to book {}",
                existing.id
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_authors(&self, author_ids: &[AuthorId]) -> ServiceResult<()> {
        if author_ids.is_empty() {
            return Err(ServiceError::InvalidInput(
                "a book needs at least one author".to_string(),
            ));
        }
        ensure_distinct("author", author_ids)?;
        for &author_id in author_ids {
            require_id("author", author_id)?;
            if !self.authors.exists(author_id)? {
                return Err(ServiceError::not_found("author", author_id));
            }
        }
        Ok(())
    }

    fn ensure_categories(&self, category_ids: &[CategoryId]) -> ServiceResult<()> {
        ensure_distinct("category", category_ids)?;
        for &category_id in category_ids {
            require_id("category", category_id)?;
            if !self.categories.exists(category_id)? {
                return Err(ServiceError::not_found("category", category_id));
            }
        }
        Ok(())
    }
}

fn ensure_distinct(entity: &'static str, ids: &[i64]) -> ServiceResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(ServiceError::InvalidInput(format!(
                "{entity} id {id} listed more than once"
            )));
        }
    }
    Ok(())
}

/// Trims text fields and checks scalar ranges.
fn validate_draft(draft: &BookDraft) -> ServiceResult<BookDraft> {
    let title = trimmed_text("title", &draft.title, 1, TITLE_MAX_CHARS)?;
    if !(0..=MAX_PUBLISHED_YEAR).contains(&draft.published_year) {
        return Err(ServiceError::InvalidInput(format!(
            "published_year must be 0..={MAX_PUBLISHED_YEAR}, got {}",
            draft.published_year
        )));
    }
    if draft.pages < 0 {
        return Err(ServiceError::InvalidInput(format!(
            "pages cannot be negative, got {}",
            draft.pages
        )));
    }
    Ok(BookDraft {
        title,
        isbn: normalize_isbn(draft.isbn.as_deref())?,
        published_year: draft.published_year,
        publisher: trimmed_optional(draft.publisher.as_deref()),
        pages: draft.pages,
    })
}
