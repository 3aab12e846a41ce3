//! Repository contract tests
//!
//! The same checks run against the in-memory store and, when a database is
//! available, against PostgreSQL:
//!
//!   DATABASE_URL=postgres://... cargo test -p blog-core -- --ignored
//!
//! Author: hephaex@gmail.com

use blog_core::memory::MemoryStore;
use blog_core::{
    ArticleRepository, CategoryRepository, NewArticle, NewCategory, NewUser, PgStore,
    RepositoryError, Role, Session, SessionRepository, UserRepository,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &id[..12])
}

fn token_hash() -> String {
    format!("{:0>64}", Uuid::new_v4().simple())
}

fn new_user() -> NewUser {
    let name = unique("user_");
    NewUser {
        email: format!("{name}@example.com"),
        username: name,
        password_hash: "$argon2id$v=19$stub".to_string(),
        role: Role::User,
    }
}

async fn user_contract<R: UserRepository>(repo: &R) {
    let new = new_user();
    let user = repo.create(&new).await.unwrap();
    assert_eq!(user.username, new.username);
    assert_eq!(user.role, Role::User);

    let by_email = repo.get_by_email(&new.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);
    let by_name = repo.get_by_username(&new.username).await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);
    assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());

    assert!(matches!(
        repo.ensure_available("fresh@example.com", &new.username).await,
        Err(RepositoryError::UsernameDuplicate)
    ));
    assert!(matches!(
        repo.ensure_available(&new.email, "fresh_name").await,
        Err(RepositoryError::EmailDuplicate)
    ));
    assert!(repo
        .ensure_available("fresh@example.com", "fresh_name")
        .await
        .is_ok());

    let mut clash = new_user();
    clash.email = new.email.clone();
    assert!(matches!(
        repo.create(&clash).await,
        Err(RepositoryError::EmailDuplicate)
    ));

    let mut promoted = user.clone();
    promoted.role = Role::Admin;
    repo.update(&promoted).await.unwrap();
    let reloaded = repo.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.role, Role::Admin);

    repo.delete(user.id).await.unwrap();
    assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(user.id).await,
        Err(RepositoryError::NotFound)
    ));
}

async fn session_contract<R: UserRepository + SessionRepository>(repo: &R) {
    let user = UserRepository::create(repo, &new_user()).await.unwrap();
    let now = Utc::now();

    let session = Session::new(user.id, token_hash(), now, Duration::days(30));
    SessionRepository::create(repo, &session).await.unwrap();

    let found = repo
        .get_by_refresh_token_hash(&session.refresh_token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, session.id);
    assert!(!found.is_revoked);

    let duplicate = Session::new(
        user.id,
        session.refresh_token_hash.clone(),
        now,
        Duration::days(30),
    );
    assert!(matches!(
        SessionRepository::create(repo, &duplicate).await,
        Err(RepositoryError::TokenHashDuplicate)
    ));

    // First revoker wins
    repo.revoke(session.id).await.unwrap();
    assert!(matches!(
        repo.revoke(session.id).await,
        Err(RepositoryError::AlreadyRevoked)
    ));
    assert!(matches!(
        repo.revoke(Uuid::new_v4()).await,
        Err(RepositoryError::NotFound)
    ));
    let revoked = SessionRepository::get_by_id(repo, session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(revoked.is_revoked);

    for _ in 0..2 {
        let other = Session::new(user.id, token_hash(), now, Duration::days(30));
        SessionRepository::create(repo, &other).await.unwrap();
    }
    assert_eq!(repo.revoke_all_for_user(user.id).await.unwrap(), 2);
    assert_eq!(repo.revoke_all_for_user(user.id).await.unwrap(), 0);

    let stale = Session::new(
        user.id,
        token_hash(),
        now - Duration::days(60),
        Duration::days(30),
    );
    SessionRepository::create(repo, &stale).await.unwrap();
    let removed = repo.delete_expired(now - Duration::days(7)).await.unwrap();
    assert!(removed >= 1);
    assert!(SessionRepository::get_by_id(repo, stale.id)
        .await
        .unwrap()
        .is_none());

    SessionRepository::delete(repo, session.id).await.unwrap();
    assert!(SessionRepository::get_by_id(repo, session.id)
        .await
        .unwrap()
        .is_none());
}

async fn content_contract<R>(repo: &R)
where
    R: UserRepository + CategoryRepository + ArticleRepository,
{
    let author = UserRepository::create(repo, &new_user()).await.unwrap();

    let new_category = NewCategory::from_name(&unique("Topic ")).unwrap();
    let category = CategoryRepository::create(repo, &new_category)
        .await
        .unwrap();
    assert_eq!(category.slug, new_category.slug);
    assert!(matches!(
        CategoryRepository::create(repo, &new_category).await,
        Err(RepositoryError::CategoryDuplicate)
    ));
    let by_slug = repo.get_by_slug(&category.slug).await.unwrap().unwrap();
    assert_eq!(by_slug.id, category.id);

    let new_article = NewArticle::new(
        "Ownership in practice",
        "Every value has exactly one owner at a time.",
        author.id,
        category.id,
    )
    .unwrap();
    let article = ArticleRepository::create(repo, &new_article).await.unwrap();

    let in_category = repo.list_by_category(category.id).await.unwrap();
    assert_eq!(in_category.len(), 1);
    let by_author = repo.list_by_author(author.id).await.unwrap();
    assert_eq!(by_author[0].id, article.id);

    assert!(matches!(
        CategoryRepository::delete(repo, category.id).await,
        Err(RepositoryError::InUse)
    ));

    ArticleRepository::delete(repo, article.id).await.unwrap();
    CategoryRepository::delete(repo, category.id).await.unwrap();
    assert!(repo.get_by_slug(&category.slug).await.unwrap().is_none());
    UserRepository::delete(repo, author.id).await.unwrap();
}

#[tokio::test]
async fn test_memory_users() {
    user_contract(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_sessions() {
    session_contract(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_content() {
    content_contract(&MemoryStore::new()).await;
}

async fn postgres() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url, 2).await.unwrap();
    store.migrate().await.unwrap();
    store
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_postgres_users() {
    user_contract(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_postgres_sessions() {
    session_contract(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_postgres_content() {
    content_contract(&postgres().await).await;
}
