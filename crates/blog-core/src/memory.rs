//! In-memory repositories and a controllable clock
//!
//! Mirrors the constraints of the PostgreSQL schema (unique username, email,
//! refresh token hash and category name/slug; articles pin their author and
//! category) so service tests exercise the same error paths.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::article::{Article, ArticleId, NewArticle};
use crate::category::{Category, CategoryId, NewCategory};
use crate::repository::{
    ArticleRepository, CategoryRepository, RepoResult, RepositoryError, SessionRepository,
    UserRepository,
};
use crate::session::Session;
use crate::user::{NewUser, User, UserId};
use crate::Clock;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    sessions: BTreeMap<Uuid, Session>,
    categories: BTreeMap<CategoryId, Category>,
    articles: BTreeMap<ArticleId, Article>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_user_unique(&self, id: Option<UserId>, username: &str, email: &str) -> RepoResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != id) {
            if user.username == username {
                return Err(RepositoryError::UsernameDuplicate);
            }
            if user.email == email {
                return Err(RepositoryError::EmailDuplicate);
            }
        }
        Ok(())
    }

    fn check_category_unique(&self, id: Option<CategoryId>, name: &str, slug: &str) -> RepoResult<()> {
        let taken = self
            .categories
            .values()
            .filter(|c| Some(c.id) != id)
            .any(|c| c.name == name || c.slug == slug);
        if taken {
            Err(RepositoryError::CategoryDuplicate)
        } else {
            Ok(())
        }
    }
}

/// All four repositories over one mutex-guarded set of tables
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Database("memory store poisoned".to_string()))
    }

    /// Number of stored sessions, revoked or not
    pub fn session_count(&self) -> usize {
        self.tables.lock().map(|t| t.sessions.len()).unwrap_or(0)
    }

    /// Every stored session of a user
    pub fn sessions_for_user(&self, user_id: UserId) -> Vec<Session> {
        self.tables
            .lock()
            .map(|t| {
                t.sessions
                    .values()
                    .filter(|s| s.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &NewUser) -> RepoResult<User> {
        let mut tables = self.lock()?;
        tables.check_user_unique(None, &user.username, &user.email)?;

        let now = Utc::now();
        let id = tables.next_id();
        let stored = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn ensure_available(&self, email: &str, username: &str) -> RepoResult<()> {
        self.lock()?.check_user_unique(None, username, email)
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_user_unique(Some(user.id), &user.username, &user.email)?;

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        tables.users.insert(user.id, updated);
        Ok(())
    }

    async fn delete(&self, id: UserId) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if tables.articles.values().any(|a| a.author_id == id) {
            return Err(RepositoryError::InUse);
        }
        tables.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if tables
            .sessions
            .values()
            .any(|s| s.refresh_token_hash == session.refresh_token_hash)
        {
            return Err(RepositoryError::TokenHashDuplicate);
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn get_by_refresh_token_hash(&self, hash: &str) -> RepoResult<Option<Session>> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> RepoResult<()> {
        let mut tables = self.lock()?;
        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if session.is_revoked {
            return Err(RepositoryError::AlreadyRevoked);
        }
        session.is_revoked = true;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> RepoResult<u64> {
        let mut tables = self.lock()?;
        let mut count = 0;
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && !s.is_revoked)
        {
            session.is_revoked = true;
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        self.lock()?
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let mut tables = self.lock()?;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at >= cutoff);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: &NewCategory) -> RepoResult<Category> {
        let mut tables = self.lock()?;
        tables.check_category_unique(None, &category.name, &category.slug)?;

        let now = Utc::now();
        let id = tables.next_id();
        let stored = Category {
            id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        Ok(self
            .lock()?
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn list(&self) -> RepoResult<Vec<Category>> {
        let mut categories: Vec<_> = self.lock()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update(&self, category: &Category) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if !tables.categories.contains_key(&category.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_category_unique(Some(category.id), &category.name, &category.slug)?;

        let mut updated = category.clone();
        updated.updated_at = Utc::now();
        tables.categories.insert(category.id, updated);
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if tables.articles.values().any(|a| a.category_id == id) {
            return Err(RepositoryError::InUse);
        }
        tables
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl MemoryStore {
    fn list_articles<F>(&self, keep: F) -> RepoResult<Vec<Article>>
    where
        F: Fn(&Article) -> bool,
    {
        let mut articles: Vec<_> = self
            .lock()?
            .articles
            .values()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }
}

#[async_trait]
impl ArticleRepository for MemoryStore {
    async fn create(&self, article: &NewArticle) -> RepoResult<Article> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&article.author_id)
            || !tables.categories.contains_key(&article.category_id)
        {
            return Err(RepositoryError::InUse);
        }

        let now = Utc::now();
        let id = tables.next_id();
        let stored = Article {
            id,
            title: article.title.clone(),
            content: article.content.clone(),
            author_id: article.author_id,
            category_id: article.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.articles.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        Ok(self.lock()?.articles.get(&id).cloned())
    }

    async fn list(&self) -> RepoResult<Vec<Article>> {
        self.list_articles(|_| true)
    }

    async fn list_by_author(&self, author_id: UserId) -> RepoResult<Vec<Article>> {
        self.list_articles(|a| a.author_id == author_id)
    }

    async fn list_by_category(&self, category_id: CategoryId) -> RepoResult<Vec<Article>> {
        self.list_articles(|a| a.category_id == category_id)
    }

    async fn update(&self, article: &Article) -> RepoResult<()> {
        let mut tables = self.lock()?;
        if !tables.categories.contains_key(&article.category_id) {
            return Err(RepositoryError::InUse);
        }
        let stored = tables
            .articles
            .get_mut(&article.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = Article {
            updated_at: Utc::now(),
            ..article.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: ArticleId) -> RepoResult<()> {
        self.lock()?
            .articles
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|t| *t).unwrap_or_else(|_| Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::new();
        UserRepository::create(&store, &new_user("alice_w", "a@example.com"))
            .await
            .unwrap();

        let dup_name = UserRepository::create(&store, &new_user("alice_w", "b@example.com")).await;
        assert!(matches!(dup_name, Err(RepositoryError::UsernameDuplicate)));

        let dup_email = UserRepository::create(&store, &new_user("bob_b", "a@example.com")).await;
        assert!(matches!(dup_email, Err(RepositoryError::EmailDuplicate)));

        assert!(matches!(
            store.ensure_available("a@example.com", "carol").await,
            Err(RepositoryError::EmailDuplicate)
        ));
        assert!(store.ensure_available("c@example.com", "carol").await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_is_first_wins() {
        let store = MemoryStore::new();
        let session = Session::new(1, "f".repeat(64), Utc::now(), Duration::days(30));
        SessionRepository::create(&store, &session).await.unwrap();

        assert!(store.revoke(session.id).await.is_ok());
        assert!(matches!(
            store.revoke(session.id).await,
            Err(RepositoryError::AlreadyRevoked)
        ));
        assert!(matches!(
            store.revoke(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_token_hash() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = Session::new(1, "a".repeat(64), now, Duration::days(1));
        let b = Session::new(2, "a".repeat(64), now, Duration::days(1));

        SessionRepository::create(&store, &a).await.unwrap();
        assert!(matches!(
            SessionRepository::create(&store, &b).await,
            Err(RepositoryError::TokenHashDuplicate)
        ));
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = Session::new(1, "1".repeat(64), now - Duration::days(40), Duration::days(30));
        let live = Session::new(1, "2".repeat(64), now, Duration::days(30));
        SessionRepository::create(&store, &old).await.unwrap();
        SessionRepository::create(&store, &live).await.unwrap();

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_category_in_use() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, &new_user("alice_w", "a@example.com"))
            .await
            .unwrap();
        let category = CategoryRepository::create(&store, &NewCategory::from_name("Rust").unwrap())
            .await
            .unwrap();
        let article = NewArticle::new("Title", "Some long content", user.id, category.id).unwrap();
        ArticleRepository::create(&store, &article).await.unwrap();

        assert!(matches!(
            CategoryRepository::delete(&store, category.id).await,
            Err(RepositoryError::InUse)
        ));
    }

    #[test]
    fn test_fixed_clock() {
        let t0 = Utc::now();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), t0 + Duration::minutes(5));
    }
}
