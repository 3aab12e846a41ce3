//! OpenAPI document
//!
//! Author: hephaex@gmail.com

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::{
    AuthResponse, ChangePasswordRequest, MessageResponse, RefreshRequest, SignInRequest,
    SignUpRequest, UpdateUserRequest, UserResponse,
};
use crate::error::ApiError;
use crate::handlers::{articles, auth, categories, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog API",
        description = "Accounts, sessions, categories and articles"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        health::metrics,
        auth::sign_up,
        auth::sign_in,
        auth::refresh,
        auth::logout,
        users::me,
        users::update_me,
        users::change_password,
        users::get_user,
        users::get_profile,
        users::promote_user,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::rename_category,
        categories::delete_category,
        articles::list_articles,
        articles::get_article,
        articles::create_article,
        articles::update_article,
        articles::delete_article,
    ),
    components(schemas(
        ApiError,
        MessageResponse,
        UserResponse,
        AuthResponse,
        SignUpRequest,
        SignInRequest,
        RefreshRequest,
        ChangePasswordRequest,
        UpdateUserRequest,
        users::PublicProfile,
        categories::CategoryResponse,
        categories::CategoryRequest,
        articles::ArticleResponse,
        articles::CreateArticleRequest,
        articles::UpdateArticleRequest,
        health::HealthResponse,
        health::BuildInfo,
        health::ReadinessResponse,
        health::ReadinessChecks,
        health::MetricsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Sign-up, sign-in and session rotation"),
        (name = "users", description = "Accounts and profiles"),
        (name = "categories", description = "Article categories"),
        (name = "articles", description = "Articles"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the generated document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
