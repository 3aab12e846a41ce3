//! Authentication API handlers
//!
//! Sign-up, sign-in, refresh-token rotation and logout.
//!
//! Author: hephaex@gmail.com

use crate::auth::{
    AuthResponse, MessageResponse, RefreshRequest, SignInRequest, SignUpRequest, UserResponse,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

/// Register a new user account
///
/// New accounts always get the `user` role.
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `409 Conflict` - Username or email already taken
/// * `422 Unprocessable Entity` - Username, email or password breaks a rule
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Malformed request", body = crate::error::ApiError),
        (status = 409, description = "Username or email already exists", body = crate::error::ApiError),
        (status = 422, description = "Invalid username, email or password", body = crate::error::ApiError),
    )
)]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let user = state.users.create_user(request).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Login with email and password
///
/// Returns a short-lived access token and a refresh token. An unknown email
/// and a wrong password give the same 401.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    request.validate()?;
    let session = state.users.login(&request.email, &request.password).await?;

    Ok(Json(session.into()))
}

/// Refresh access token
///
/// The presented refresh token is revoked and a new pair is issued. Reusing
/// a rotated token is rejected.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New tokens issued", body = AuthResponse),
        (status = 401, description = "Unknown, revoked or expired refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    request.validate()?;
    let session = state.users.refresh_session(&request.refresh_token).await?;

    Ok(Json(session.into()))
}

/// Logout by revoking the session behind a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "Unknown, revoked or expired refresh token", body = crate::error::ApiError),
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;
    state.users.logout(&request.refresh_token).await?;

    Ok(Json(MessageResponse::new("Logged out")))
}
