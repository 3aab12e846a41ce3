//! PostgreSQL store
//!
//! Implements every repository trait on a single connection pool using SQLx.
//! Unique and foreign-key violations are recognised by constraint name so the
//! services can tell a taken username from a taken email.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::article::{Article, ArticleId, NewArticle};
use crate::category::{Category, CategoryId, NewCategory};
use crate::repository::{
    ArticleRepository, CategoryRepository, RepoResult, RepositoryError, SessionRepository,
    UserRepository,
};
use crate::session::Session;
use crate::user::{NewUser, Role, User, UserId};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";
const TOKEN_HASH_CONSTRAINT: &str = "sessions_refresh_token_hash_key";

/// PostgreSQL-backed repositories
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("migration failed: {e}")))
    }

    /// Round-trip to the database, used by readiness checks
    pub async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
            Some(USERNAME_CONSTRAINT) => RepositoryError::UsernameDuplicate,
            Some(EMAIL_CONSTRAINT) => RepositoryError::EmailDuplicate,
            Some(TOKEN_HASH_CONSTRAINT) => RepositoryError::TokenHashDuplicate,
            Some(c) if c.starts_with("categories_") => RepositoryError::CategoryDuplicate,
            _ => RepositoryError::Database(err.to_string()),
        },
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepositoryError::InUse,
        _ => RepositoryError::Database(err.to_string()),
    }
}

fn expect_one_row(rows_affected: u64) -> RepoResult<()> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| RepositoryError::Database(format!("unknown role '{}'", row.role)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

impl PgStore {
    async fn fetch_user(&self, column: &str, value: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: &NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        User::try_from(row)
    }

    async fn get_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.fetch_user("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.fetch_user("username", username).await
    }

    async fn ensure_available(&self, email: &str, username: &str) -> RepoResult<()> {
        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            "SELECT \
                EXISTS(SELECT 1 FROM users WHERE username = $1), \
                EXISTS(SELECT 1 FROM users WHERE email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if username_taken {
            return Err(RepositoryError::UsernameDuplicate);
        }
        if email_taken {
            return Err(RepositoryError::EmailDuplicate);
        }
        Ok(())
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, role = $5, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }

    async fn delete(&self, id: UserId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: i64,
    refresh_token_hash: String,
    is_revoked: bool,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            refresh_token_hash: row.refresh_token_hash,
            is_revoked: row.is_revoked,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, is_revoked, created_at, expires_at";

#[async_trait]
impl SessionRepository for PgStore {
    async fn create(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, is_revoked, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(session.is_revoked)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Session::from))
    }

    async fn get_by_refresh_token_hash(&self, hash: &str) -> RepoResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token_hash = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Session::from))
    }

    async fn revoke(&self, id: Uuid) -> RepoResult<()> {
        let result =
            sqlx::query("UPDATE sessions SET is_revoked = TRUE WHERE id = $1 AND is_revoked = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<bool> =
            sqlx::query_scalar("SELECT is_revoked FROM sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        match exists {
            Some(_) => Err(RepositoryError::AlreadyRevoked),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> RepoResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_revoked = TRUE WHERE user_id = $1 AND is_revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, slug, created_at, updated_at";

#[async_trait]
impl CategoryRepository for PgStore {
    async fn create(&self, category: &NewCategory) -> RepoResult<Category> {
        let sql = format!(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(&category.name)
            .bind(&category.slug)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Category::from))
    }

    async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Category::from))
    }

    async fn list(&self) -> RepoResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name");
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(&self, category: &Category) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }

    async fn delete(&self, id: CategoryId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    content: String,
    author_id: i64,
    category_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ARTICLE_COLUMNS: &str = "id, title, content, author_id, category_id, created_at, updated_at";

impl PgStore {
    async fn list_articles_where(&self, filter: &str, value: Option<i64>) -> RepoResult<Vec<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles {filter} ORDER BY created_at DESC");
        let mut query = sqlx::query_as::<_, ArticleRow>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Article::from).collect())
    }
}

#[async_trait]
impl ArticleRepository for PgStore {
    async fn create(&self, article: &NewArticle) -> RepoResult<Article> {
        let sql = format!(
            "INSERT INTO articles (title, content, author_id, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&article.title)
            .bind(&article.content)
            .bind(article.author_id)
            .bind(article.category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Article::from))
    }

    async fn list(&self) -> RepoResult<Vec<Article>> {
        self.list_articles_where("", None).await
    }

    async fn list_by_author(&self, author_id: UserId) -> RepoResult<Vec<Article>> {
        self.list_articles_where("WHERE author_id = $1", Some(author_id))
            .await
    }

    async fn list_by_category(&self, category_id: CategoryId) -> RepoResult<Vec<Article>> {
        self.list_articles_where("WHERE category_id = $1", Some(category_id))
            .await
    }

    async fn update(&self, article: &Article) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE articles SET title = $2, content = $3, category_id = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.category_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }

    async fn delete(&self, id: ArticleId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        expect_one_row(result.rows_affected())
    }
}
