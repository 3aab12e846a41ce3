//! Article handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthPrincipal;
use crate::error::AppError;
use crate::services::ArticleUpdate;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use blog_core::{Article, ArticleId, CategoryId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArticleResponse {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            author_id: article.author_id,
            category_id: article.category_id,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// Filters for article listing; at most one may be given
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ArticleQuery {
    /// Only articles by this author
    pub author_id: Option<UserId>,
    /// Only articles in the category with this slug
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 1024))]
    pub title: String,
    #[validate(length(min = 1, max = 65536))]
    pub content: String,
    /// Slug of an existing category
    #[schema(example = "rust-tips")]
    pub category: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 1024))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 65536))]
    pub content: Option<String>,
    pub category: Option<String>,
}

fn into_responses(articles: Vec<Article>) -> Json<Vec<ArticleResponse>> {
    Json(articles.into_iter().map(Into::into).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/articles",
    tag = "articles",
    params(ArticleQuery),
    responses(
        (status = 200, description = "Articles, newest first", body = Vec<ArticleResponse>),
        (status = 400, description = "Both filters given", body = crate::error::ApiError),
        (status = 404, description = "Category not found", body = crate::error::ApiError),
    )
)]
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<Vec<ArticleResponse>>, AppError> {
    let articles = match (query.author_id, query.category.as_deref()) {
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest(
                "author_id and category cannot be combined".to_string(),
            ))
        }
        (Some(author_id), None) => state.articles.list_by_author(author_id).await?,
        (None, Some(slug)) => state.articles.list_by_category(slug).await?,
        (None, None) => state.articles.list().await?,
    };

    Ok(into_responses(articles))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}",
    tag = "articles",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "Article not found", body = crate::error::ApiError),
    )
)]
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = state.articles.get(id).await?;
    Ok(Json(article.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/articles",
    tag = "articles",
    security(("bearer_auth" = [])),
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article published", body = ArticleResponse),
        (status = 404, description = "Category not found", body = crate::error::ApiError),
        (status = 422, description = "Invalid title or content", body = crate::error::ApiError),
    )
)]
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let article = state
        .articles
        .create(&principal, &request.title, &request.content, &request.category)
        .await?;

    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/articles/{id}",
    tag = "articles",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ArticleResponse),
        (status = 403, description = "Caller is neither the author nor an admin", body = crate::error::ApiError),
        (status = 404, description = "Article or category not found", body = crate::error::ApiError),
    )
)]
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<ArticleId>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleResponse>, AppError> {
    request.validate()?;
    let update = ArticleUpdate {
        title: request.title,
        content: request.content,
        category_slug: request.category,
    };
    let article = state.articles.update(&principal, id, update).await?;

    Ok(Json(article.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/articles/{id}",
    tag = "articles",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 403, description = "Caller is neither the author nor an admin", body = crate::error::ApiError),
        (status = 404, description = "Article not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<ArticleId>,
) -> Result<StatusCode, AppError> {
    state.articles.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
