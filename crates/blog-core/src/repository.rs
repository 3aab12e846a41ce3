//! Repository contracts
//!
//! Services depend on these traits only. Implementations report storage
//! conditions through [`RepositoryError`]; the services decide what each
//! condition means to a caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::article::{Article, ArticleId, NewArticle};
use crate::category::{Category, CategoryId, NewCategory};
use crate::session::Session;
use crate::user::{NewUser, User, UserId};

/// Storage-level failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("username already exists")]
    UsernameDuplicate,

    #[error("email already exists")]
    EmailDuplicate,

    #[error("refresh token hash already exists")]
    TokenHashDuplicate,

    #[error("category already exists")]
    CategoryDuplicate,

    #[error("record is still referenced")]
    InUse,

    #[error("session already revoked")]
    AlreadyRevoked,

    #[error("database error: {0}")]
    Database(String),
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; duplicate username or email is reported distinctly
    async fn create(&self, user: &NewUser) -> RepoResult<User>;

    async fn get_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Fails with `UsernameDuplicate` or `EmailDuplicate` when either is taken
    async fn ensure_available(&self, email: &str, username: &str) -> RepoResult<()>;

    /// Persist username, email, password hash and role
    async fn update(&self, user: &User) -> RepoResult<()>;

    async fn delete(&self, id: UserId) -> RepoResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session; a duplicate refresh token hash is `TokenHashDuplicate`
    async fn create(&self, session: &Session) -> RepoResult<()>;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Session>>;

    async fn get_by_refresh_token_hash(&self, hash: &str) -> RepoResult<Option<Session>>;

    /// Mark a session revoked if it is not already.
    ///
    /// Exactly one concurrent caller succeeds; the others get
    /// `AlreadyRevoked`. A missing session is `NotFound`.
    async fn revoke(&self, id: Uuid) -> RepoResult<()>;

    /// Revoke every live session of a user, returning how many changed
    async fn revoke_all_for_user(&self, user_id: UserId) -> RepoResult<u64>;

    async fn delete(&self, id: Uuid) -> RepoResult<()>;

    /// Retention cleanup: drop sessions that expired before `cutoff`
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &NewCategory) -> RepoResult<Category>;

    async fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;

    async fn list(&self) -> RepoResult<Vec<Category>>;

    async fn update(&self, category: &Category) -> RepoResult<()>;

    /// `InUse` while any article references the category
    async fn delete(&self, id: CategoryId) -> RepoResult<()>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &NewArticle) -> RepoResult<Article>;

    async fn get_by_id(&self, id: ArticleId) -> RepoResult<Option<Article>>;

    async fn list(&self) -> RepoResult<Vec<Article>>;

    async fn list_by_author(&self, author_id: UserId) -> RepoResult<Vec<Article>>;

    async fn list_by_category(&self, category_id: CategoryId) -> RepoResult<Vec<Article>>;

    async fn update(&self, article: &Article) -> RepoResult<()>;

    async fn delete(&self, id: ArticleId) -> RepoResult<()>;
}
