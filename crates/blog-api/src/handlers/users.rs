//! Account handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::{
    AuthPrincipal, ChangePasswordRequest, MessageResponse, UpdateUserRequest, UserResponse,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use blog_core::{UserId, UserPublic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Profile visible to anyone; never includes the email
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    #[schema(example = "user")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserPublic> for PublicProfile {
    fn from(user: UserPublic) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}

/// Current user's account
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.get_user(principal.user_id).await?;
    Ok(Json(user.into()))
}

/// Change username and/or email
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 409, description = "Value taken or unchanged", body = crate::error::ApiError),
        (status = 422, description = "Invalid value or nothing to update", body = crate::error::ApiError),
    )
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    request.validate()?;
    let user = state.users.update_user(principal.user_id, request).await?;
    Ok(Json(user.into()))
}

/// Change password
///
/// Other sessions of the user are revoked unless disabled in configuration.
#[utoipa::path(
    put,
    path = "/api/v1/users/me/password",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Old password is wrong", body = crate::error::ApiError),
        (status = 409, description = "New password equals the old one", body = crate::error::ApiError),
        (status = 422, description = "New password breaks a rule", body = crate::error::ApiError),
    )
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;
    state
        .users
        .change_password(principal.user_id, &request.old_password, &request.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed")))
}

/// Public profile by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile", body = PublicProfile),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> Result<Json<PublicProfile>, AppError> {
    let user = state.users.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Public profile by username
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{username}",
    tag = "users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile", body = PublicProfile),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, AppError> {
    let user = state.users.get_user_by_username(&username).await?;
    Ok(Json(user.into()))
}

/// Grant the admin role (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/admin",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User promoted", body = UserResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "User is already an admin", body = crate::error::ApiError),
    )
)]
pub async fn promote_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.set_admin_role(id).await?;
    Ok(Json(user.into()))
}
