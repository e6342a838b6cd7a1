//! Category use-case service.

use crate::model::category::{Category, CategoryDraft, CategoryId};
use crate::repo::book_repo::BookRepository;
use crate::repo::category_repo::CategoryRepository;
use crate::service::{
    name_conflict, normalize_page, require_id, trimmed_text, Paged, ServiceError, ServiceResult,
};
use log::info;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

/// Category service facade; deletes are guarded by book references.
pub struct CategoryService<C: CategoryRepository, B: BookRepository> {
    categories: C,
    books: B,
}

impl<C: CategoryRepository, B: BookRepository> CategoryService<C, B> {
    pub fn new(categories: C, books: B) -> Self {
        Self { categories, books }
    }

    pub fn list(&self, limit: i64, offset: i64) -> ServiceResult<Paged<Category>> {
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.categories.find_all(limit, offset)?,
            total: self.categories.count()?,
            limit,
            offset,
        })
    }

    pub fn get(&self, id: CategoryId) -> ServiceResult<Category> {
        require_id("category", id)?;
        self.categories
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    pub fn search(&self, term: &str, limit: i64, offset: i64) -> ServiceResult<Paged<Category>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(limit, offset);
        }
        let (limit, offset) = normalize_page(limit, offset);
        Ok(Paged {
            items: self.categories.search(term, limit, offset)?,
            total: self.categories.count_search(term)?,
            limit,
            offset,
        })
    }

    pub fn create(&self, name: &str) -> ServiceResult<Category> {
        let name = trimmed_text("category name", name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        if self.categories.find_by_name(&name)?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "category `{name}` already exists"
            )));
        }
        let category = self
            .categories
            .create(&CategoryDraft::new(name))
            .map_err(name_conflict)?;
        info!(
            "event=category_create module=service status=ok category_id={}",
            category.id
        );
        Ok(category)
    }

    pub fn update(&self, id: CategoryId, name: &str) -> ServiceResult<Category> {
        require_id("category", id)?;
        let name = trimmed_text("category name", name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        if !self.categories.exists(id)? {
            return Err(ServiceError::not_found("category", id));
        }
        match self.categories.find_by_name(&name)? {
            Some(existing) if existing.id != id => Err(ServiceError::Conflict(format!(
                "another category is already named `{name}`"
            ))),
            _ => Ok(self
                .categories
                .update(id, &CategoryDraft::new(name))
                .map_err(name_conflict)?),
        }
    }

    pub fn delete(&self, id: CategoryId) -> ServiceResult<()> {
        require_id("category", id)?;
        if !self.categories.exists(id)? {
            return Err(ServiceError::not_found("category", id));
        }
        if !self.books.find_by_category_id(id, 1, 0)?.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "category {id} is still referenced by books"
            )));
        }
        self.categories.delete(id)?;
        info!("event=category_delete module=service status=ok category_id={id}");
        Ok(())
    }
}
