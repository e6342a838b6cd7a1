//! Quote use-case service.
//!
//! # Invariants
//! - Quote text is trimmed and 3..=5000 characters.
//! - A quote always points at an existing book; `update` changes the text
//!   and keeps the book.
//! - Every paged list reports the total of the count that mirrors its find.

use crate::model::author::AuthorId;
use crate::model::book::BookId;
use crate::model::category::CategoryId;
use crate::model::quote::{Quote, QuoteDraft, QuoteFilter, QuoteId};
use crate::repo::book_repo::BookRepository;
use crate::repo::quote_repo::QuoteRepository;
use crate::service::{
    normalize_page, require_id, trimmed_text, Paged, ServiceError, ServiceResult,
};
use log::info;

const TEXT_MIN_CHARS: usize = 3;
const TEXT_MAX_CHARS: usize = 5000;

/// Quote service facade over quote and book stores.
pub struct QuoteService<Q: QuoteRepository, B: BookRepository> {
    quotes: Q,
    books: B,
}

impl<Q: QuoteRepository, B: BookRepository> QuoteService<Q, B> {
    pub fn new(quotes: Q, books: B) -> Self {
        Self { quotes, books }
    }

    pub fn list(&self, limit: i64, offset: i64) -> ServiceResult<Paged<Quote>> {
        self.list_filtered(&QuoteFilter::default(), limit, offset)
    }

    pub fn get(&self, id: QuoteId) -> ServiceResult<Quote> {
        require_id("quote", id)?;
        self.quotes
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::not_found("quote", id))
    }

    /// Quotes of one existing book.
    pub fn list_by_book(
        &self,
        book_id: BookId,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Quote>> {
        require_id("book", book_id)?;
        self.ensure_book(book_id)?;
        self.list_filtered(&QuoteFilter::by_book(book_id), limit, offset)
    }

    pub fn list_by_author(
        &self,
        author_id: AuthorId,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Quote>> {
        require_id("author", author_id)?;
        self.list_filtered(&QuoteFilter::by_author(author_id), limit, offset)
    }

    pub fn list_by_category(
        &self,
        category_id: CategoryId,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Quote>> {
        require_id("category", category_id)?;
        self.list_filtered(&QuoteFilter::by_category(category_id), limit, offset)
    }

    /// Lists quotes matching every filter that is set.
    pub fn list_filtered(
        &self,
        filter: &QuoteFilter,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Quote>> {
        if let Some(book_id) = filter.book_id {
            require_id("book", book_id)?;
        }
        if let Some(author_id) = filter.author_id {
            require_id("author", author_id)?;
        }
        if let Some(category_id) = filter.category_id {
            require_id("category", category_id)?;
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.quotes.find_by_filters(filter, limit, offset)?,
            total: self.quotes.count_by_filters(filter)?,
            limit,
            offset,
        })
    }

    /// One uniformly chosen quote; `NotFound` on an empty catalog.
    pub fn random(&self) -> ServiceResult<Quote> {
        self.quotes
            .find_random()?
            .ok_or_else(|| ServiceError::not_found("quote", "random"))
    }

    /// Text search; a blank term lists every quote.
    pub fn search(&self, term: &str, limit: i64, offset: i64) -> ServiceResult<Paged<Quote>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(limit, offset);
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.quotes.search(term, limit, offset)?,
            total: self.quotes.count_search(term)?,
            limit,
            offset,
        })
    }

    /// Search over quote text, book title and author names.
    pub fn search_everywhere(
        &self,
        term: &str,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Paged<Quote>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(limit, offset);
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self
                .quotes
                .search_in_book_and_author(term, limit, offset)?,
            total: self.quotes.count_search_in_book_and_author(term)?,
            limit,
            offset,
        })
    }

    pub fn create(&self, book_id: BookId, text: &str) -> ServiceResult<Quote> {
        require_id("book", book_id)?;
        let text = trimmed_text("quote text", text, TEXT_MIN_CHARS, TEXT_MAX_CHARS)?;
        self.ensure_book(book_id)?;
        let quote = self.quotes.create(&QuoteDraft::new(book_id, text))?;
        info!(
            "event=quote_create module=service status=ok quote_id={} book_id={book_id}",
            quote.id
        );
        Ok(quote)
    }

    /// Replaces the text of an existing quote.
    pub fn update(&self, id: QuoteId, text: &str) -> ServiceResult<Quote> {
        require_id("quote", id)?;
        let text = trimmed_text("quote text", text, TEXT_MIN_CHARS, TEXT_MAX_CHARS)?;
        let existing = self
            .quotes
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::not_found("quote", id))?;
        Ok(self
            .quotes
            .update(id, &QuoteDraft::new(existing.book_id, text))?)
    }

    pub fn delete(&self, id: QuoteId) -> ServiceResult<()> {
        require_id("quote", id)?;
        self.quotes.delete(id)?;
        info!("event=quote_delete module=service status=ok quote_id={id}");
        Ok(())
    }

    fn ensure_book(&self, book_id: BookId) -> ServiceResult<()> {
        if self.books.exists(book_id)? {
            Ok(())
        } else {
            Err(ServiceError::not_found("book", book_id))
        }
    }
}
