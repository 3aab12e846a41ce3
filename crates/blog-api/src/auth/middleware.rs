/// Authentication middleware for protecting routes
///
/// Extracts the Bearer token from the Authorization header, verifies it
/// through the user service, and adds the resulting [`AuthPrincipal`] to
/// request extensions. A token that fails to parse or verify is a 401; any
/// other verification failure is a 500.
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use blog_core::ErrorKind;
use thiserror::Error;

use super::models::AuthPrincipal;
use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::state::AppState;

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Token verification failed")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Require a valid access token
///
/// ```ignore
/// let protected = Router::new()
///     .route("/users/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)?;

    let principal = match state.users.verify_access_token(token) {
        Ok(principal) => principal,
        Err(e) if e.kind() == ErrorKind::Unauthorized => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
            });
            return Err(AuthError::InvalidToken);
        }
        Err(_) => return Err(AuthError::Internal),
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Require the admin role; must run after [`auth_middleware`]
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<AuthPrincipal>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if !principal.is_admin() {
        audit_log(&AuditEvent::AccessDenied {
            user_id: principal.user_id,
            resource: request.uri().path().to_string(),
            required_role: "admin".to_string(),
        });
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}
