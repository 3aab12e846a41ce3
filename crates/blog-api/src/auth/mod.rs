//! Authentication and authorization module
//!
//! This module provides the account and session machinery:
//! - Access token issuing and verification (HS256 JWT)
//! - Opaque refresh tokens and their digests
//! - Password hashing with Argon2id
//! - The user service (sign-up, login, refresh rotation, logout, password and role changes)
//! - Middleware for request authentication

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use jwt::{
    hash_refresh_token, AccessToken, Claims, JwtTokenManager, RefreshToken, TokenError,
    TokenManager,
};
pub use middleware::{auth_middleware, require_admin, AuthError};
pub use models::{
    AuthPrincipal, AuthResponse, AuthSession, ChangePasswordRequest, MessageResponse,
    RefreshRequest, SignInRequest, SignUpRequest, UpdateUserRequest, UserResponse,
};
pub use password::{Argon2HashManager, HashManager, PasswordError};
pub use service::UserService;
