//! Article publishing
//!
//! Any authenticated user may publish into an existing category. Only the
//! author, or an admin, may change or remove an article.

use std::sync::Arc;

use blog_core::{
    Article, ArticleChanges, ArticleId, ArticleRepository, BlogError, CategoryRepository,
    ErrorKind, NewArticle, RepositoryError, Result, UserId,
};
use tracing::info;

use super::internal;
use crate::auth::AuthPrincipal;

/// Requested article changes; the category is named by slug
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_slug: Option<String>,
}

pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl ArticleService {
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            articles,
            categories,
        }
    }

    async fn category_id(&self, op: &'static str, slug: &str) -> Result<i64> {
        self.categories
            .get_by_slug(slug)
            .await
            .map_err(|e| internal(op, e))?
            .map(|c| c.id)
            .ok_or_else(|| BlogError::new(op, ErrorKind::CategoryNotFound))
    }

    async fn require_article(&self, op: &'static str, id: ArticleId) -> Result<Article> {
        self.articles
            .get_by_id(id)
            .await
            .map_err(|e| internal(op, e))?
            .ok_or_else(|| BlogError::new(op, ErrorKind::ArticleNotFound))
    }

    pub async fn create(
        &self,
        author: &AuthPrincipal,
        title: &str,
        content: &str,
        category_slug: &str,
    ) -> Result<Article> {
        const OP: &str = "ArticleService::create";

        let category_id = self.category_id(OP, category_slug).await?;
        let new = NewArticle::new(title, content, author.user_id, category_id)
            .map_err(|kind| BlogError::new(OP, kind))?;

        let article = self.articles.create(&new).await.map_err(|e| match e {
            // Category removed between the lookup and the insert
            RepositoryError::InUse => BlogError::new(OP, ErrorKind::CategoryNotFound),
            other => internal(OP, other),
        })?;

        info!(article_id = article.id, author_id = author.user_id, "Article published");
        Ok(article)
    }

    pub async fn get(&self, id: ArticleId) -> Result<Article> {
        self.require_article("ArticleService::get", id).await
    }

    pub async fn list(&self) -> Result<Vec<Article>> {
        const OP: &str = "ArticleService::list";
        self.articles.list().await.map_err(|e| internal(OP, e))
    }

    pub async fn list_by_author(&self, author_id: UserId) -> Result<Vec<Article>> {
        const OP: &str = "ArticleService::list_by_author";
        self.articles
            .list_by_author(author_id)
            .await
            .map_err(|e| internal(OP, e))
    }

    pub async fn list_by_category(&self, category_slug: &str) -> Result<Vec<Article>> {
        const OP: &str = "ArticleService::list_by_category";
        let category_id = self.category_id(OP, category_slug).await?;
        self.articles
            .list_by_category(category_id)
            .await
            .map_err(|e| internal(OP, e))
    }

    pub async fn update(
        &self,
        principal: &AuthPrincipal,
        id: ArticleId,
        update: ArticleUpdate,
    ) -> Result<Article> {
        const OP: &str = "ArticleService::update";

        let mut article = self.require_article(OP, id).await?;
        if !article.can_be_modified_by(principal.user_id, principal.is_admin()) {
            return Err(BlogError::new(OP, ErrorKind::NotAuthor));
        }

        let category_id = match &update.category_slug {
            Some(slug) => Some(self.category_id(OP, slug).await?),
            None => None,
        };
        article
            .apply(ArticleChanges {
                title: update.title,
                content: update.content,
                category_id,
            })
            .map_err(|kind| BlogError::new(OP, kind))?;

        self.articles.update(&article).await.map_err(|e| match e {
            RepositoryError::NotFound => BlogError::new(OP, ErrorKind::ArticleNotFound),
            RepositoryError::InUse => BlogError::new(OP, ErrorKind::CategoryNotFound),
            other => internal(OP, other),
        })?;

        Ok(article)
    }

    pub async fn delete(&self, principal: &AuthPrincipal, id: ArticleId) -> Result<()> {
        const OP: &str = "ArticleService::delete";

        let article = self.require_article(OP, id).await?;
        if !article.can_be_modified_by(principal.user_id, principal.is_admin()) {
            return Err(BlogError::new(OP, ErrorKind::NotAuthor));
        }

        self.articles.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => BlogError::new(OP, ErrorKind::ArticleNotFound),
            other => internal(OP, other),
        })?;

        info!(article_id = id, "Article deleted");
        Ok(())
    }
}
