//! Category handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthPrincipal;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use blog_core::{Category, CategoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: CategoryId,
    #[schema(example = "Rust Tips")]
    pub name: String,
    #[schema(example = "rust-tips")]
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryResponse>),
    )
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = state.categories.list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}",
    tag = "categories",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::error::ApiError),
    )
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = state.categories.get_by_slug(&slug).await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 409, description = "Category already exists", body = crate::error::ApiError),
    )
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let category = state.categories.create(&principal, &request.name).await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = CategoryResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "Category not found", body = crate::error::ApiError),
        (status = 409, description = "Name taken or unchanged", body = crate::error::ApiError),
    )
)]
pub async fn rename_category(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<CategoryId>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    request.validate()?;
    let category = state
        .categories
        .rename(&principal, id, &request.name)
        .await?;

    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "Category not found", body = crate::error::ApiError),
        (status = 409, description = "Category still has articles", body = crate::error::ApiError),
    )
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    state.categories.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
