//! Author use-case service.
//!
//! # Invariants
//! - Names are trimmed and 2..=200 characters.
//! - Names are unique case-insensitively; a duplicate is a `Conflict`.
//! - An author referenced by any book cannot be deleted.

use crate::model::author::{Author, AuthorDraft, AuthorId};
use crate::repo::author_repo::AuthorRepository;
use crate::repo::book_repo::BookRepository;
use crate::service::{
    name_conflict, normalize_page, require_id, trimmed_text, Paged, ServiceError, ServiceResult,
};
use log::info;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 200;

/// Author service facade over author and book stores.
pub struct AuthorService<A: AuthorRepository, B: BookRepository> {
    authors: A,
    books: B,
}

impl<A: AuthorRepository, B: BookRepository> AuthorService<A, B> {
    pub fn new(authors: A, books: B) -> Self {
        Self { authors, books }
    }

    pub fn list(&self, limit: i64, offset: i64) -> ServiceResult<Paged<Author>> {
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.authors.find_all(limit, offset)?,
            total: self.authors.count()?,
            limit,
            offset,
        })
    }

    pub fn get(&self, id: AuthorId) -> ServiceResult<Author> {
        require_id("author", id)?;
        self.authors
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::not_found("author", id))
    }

    pub fn get_by_name(&self, name: &str) -> ServiceResult<Author> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "author name cannot be empty".to_string(),
            ));
        }
        self.authors
            .find_by_name(name)?
            .ok_or_else(|| ServiceError::not_found("author", name))
    }

    /// Substring search on name; a blank term lists every author.
    pub fn search(&self, term: &str, limit: i64, offset: i64) -> ServiceResult<Paged<Author>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(limit, offset);
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.authors.search(term, limit, offset)?,
            total: self.authors.count_search(term)?,
            limit,
            offset,
        })
    }

    pub fn create(&self, name: &str) -> ServiceResult<Author> {
        let name = trimmed_text("author name", name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        if self.authors.find_by_name(&name)?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "author `{name}` already exists"
            )));
        }
        let author = self
            .authors
            .create(&AuthorDraft::new(name))
            .map_err(name_conflict)?;
        info!(
            "event=author_create module=service status=ok author_id={}",
            author.id
        );
        Ok(author)
    }

    pub fn update(&self, id: AuthorId, name: &str) -> ServiceResult<Author> {
        require_id("author", id)?;
        let name = trimmed_text("author name", name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        if !self.authors.exists(id)? {
            return Err(ServiceError::not_found("author", id));
        }
        if let Some(existing) = self.authors.find_by_name(&name)? {
            if existing.id != id {
                return Err(ServiceError::Conflict(format!(
                    "another author is already named `{name}`"
                )));
            }
        }
        Ok(self
            .authors
            .update(id, &AuthorDraft::new(name))
            .map_err(name_conflict)?)
    }

    /// Deletes an author no book references.
    pub fn delete(&self, id: AuthorId) -> ServiceResult<()> {
        require_id("author", id)?;
        if !self.authors.exists(id)? {
            return Err(ServiceError::not_found("author", id));
        }
        if !self.books.find_by_author_id(id, 1, 0)?.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "author {id} is still referenced by books"
            )));
        }
        self.authors.delete(id)?;
        info!("event=author_delete module=service status=ok author_id={id}");
        Ok(())
    }
}
