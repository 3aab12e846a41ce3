//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::{auth_middleware, require_admin};
use crate::handlers::{articles, auth, categories, users};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/users/:id", get(users::get_user))
        .route("/profiles/:username", get(users::get_profile))
        .route("/categories", get(categories::list_categories))
        // Same segment as the admin routes below; GET reads it as a slug
        .route("/categories/:id", get(categories::get_category))
        .route("/articles", get(articles::list_articles))
        .route("/articles/:id", get(articles::get_article));

    // Admin routes (admin role required)
    let admin_routes = Router::new()
        .route("/users/:id/admin", post(users::promote_user))
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/:id",
            put(categories::rename_category).delete(categories::delete_category),
        )
        .route_layer(middleware::from_fn(require_admin));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/password", put(users::change_password))
        .route("/articles", post(articles::create_article))
        .route(
            "/articles/:id",
            axum::routing::patch(articles::update_article).delete(articles::delete_article),
        )
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    // Combine routes
    Router::new().merge(public_routes).merge(protected_routes)
}

/// Count every request for the metrics endpoint
pub async fn count_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.increment_requests();
    next.run(request).await
}
