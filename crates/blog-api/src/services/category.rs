//! Category management
//!
//! Anyone may read categories; creating, renaming and deleting them is
//! reserved for admins.

use std::sync::Arc;

use blog_core::category::NewCategory;
use blog_core::{
    BlogError, Category, CategoryId, CategoryRepository, ErrorKind, RepositoryError, Result,
};
use tracing::info;

use super::internal;
use crate::auth::AuthPrincipal;

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

fn require_admin(op: &'static str, principal: &AuthPrincipal) -> Result<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(BlogError::new(op, ErrorKind::PermissionDenied))
    }
}

fn write_error(op: &'static str, err: RepositoryError) -> BlogError {
    match err {
        RepositoryError::CategoryDuplicate => BlogError::new(op, ErrorKind::CategoryExists),
        RepositoryError::NotFound => BlogError::new(op, ErrorKind::CategoryNotFound),
        RepositoryError::InUse => BlogError::new(op, ErrorKind::CategoryInUse),
        other => internal(op, other),
    }
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, principal: &AuthPrincipal, name: &str) -> Result<Category> {
        const OP: &str = "CategoryService::create";
        require_admin(OP, principal)?;

        let new = NewCategory::from_name(name).map_err(|kind| BlogError::new(OP, kind))?;
        let category = self
            .categories
            .create(&new)
            .await
            .map_err(|e| write_error(OP, e))?;

        info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        const OP: &str = "CategoryService::list";
        self.categories.list().await.map_err(|e| internal(OP, e))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Category> {
        const OP: &str = "CategoryService::get_by_slug";
        self.categories
            .get_by_slug(slug)
            .await
            .map_err(|e| internal(OP, e))?
            .ok_or_else(|| BlogError::new(OP, ErrorKind::CategoryNotFound))
    }

    pub async fn rename(
        &self,
        principal: &AuthPrincipal,
        id: CategoryId,
        name: &str,
    ) -> Result<Category> {
        const OP: &str = "CategoryService::rename";
        require_admin(OP, principal)?;

        let mut category = self
            .categories
            .get_by_id(id)
            .await
            .map_err(|e| internal(OP, e))?
            .ok_or_else(|| BlogError::new(OP, ErrorKind::CategoryNotFound))?;

        category
            .rename(name)
            .map_err(|kind| BlogError::new(OP, kind))?;
        self.categories
            .update(&category)
            .await
            .map_err(|e| write_error(OP, e))?;

        Ok(category)
    }

    pub async fn delete(&self, principal: &AuthPrincipal, id: CategoryId) -> Result<()> {
        const OP: &str = "CategoryService::delete";
        require_admin(OP, principal)?;

        self.categories
            .delete(id)
            .await
            .map_err(|e| write_error(OP, e))?;

        info!(category_id = id, "Category deleted");
        Ok(())
    }
}
