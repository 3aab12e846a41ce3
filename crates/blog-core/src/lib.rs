//! Blog Core - Domain models, validation, and shared types
//!
//! This crate defines the core abstractions used throughout the blog backend:
//! - Domain models (users, sessions, articles, categories) and their input rules
//! - The error taxonomy shared by every service
//! - Configuration management
//! - Repository contracts and the PostgreSQL store

pub mod article;
pub mod category;
pub mod config;
pub mod error;
pub mod postgres;
pub mod repository;
pub mod session;
pub mod user;

#[cfg(feature = "test-utils")]
pub mod memory;

pub use article::{Article, ArticleChanges, ArticleId, NewArticle};
pub use category::{Category, CategoryId, NewCategory};
pub use config::{AppConfig, AuthConfig, ConfigError, PasswordHashConfig};
pub use error::{BlogError, ErrorClass, ErrorKind, Result};
pub use postgres::PgStore;
pub use repository::{
    ArticleRepository, CategoryRepository, RepoResult, RepositoryError, SessionRepository,
    UserRepository,
};
pub use session::{Session, SessionState};
pub use user::{NewUser, Role, User, UserId, UserPublic};

use chrono::{DateTime, Utc};

// ============================================================================
// Time
// ============================================================================

/// Source of the current time.
///
/// Every expiry decision (access tokens, sessions) goes through a clock so
/// tests can pin or advance time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
