//! Application state management
//!
//! Author: hephaex@gmail.com

use blog_core::{
    AppConfig, ArticleRepository, CategoryRepository, Clock, PgStore, SessionRepository,
    SystemClock, UserRepository,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{
    Argon2HashManager, HashManager, JwtTokenManager, PasswordError, TokenManager, UserService,
};
use crate::services::{ArticleService, CategoryService};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Accounts and sessions
    pub users: UserService,
    /// Articles
    pub articles: ArticleService,
    /// Categories
    pub categories: CategoryService,
    /// Database handle for readiness checks, absent for in-memory setups
    pub database: Option<PgStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Wire every service to one store that implements all repositories
    pub fn with_store<S>(config: AppConfig, store: Arc<S>) -> Result<Self, PasswordError>
    where
        S: UserRepository + SessionRepository + ArticleRepository + CategoryRepository + 'static,
    {
        Self::with_store_and_clock(config, store, Arc::new(SystemClock))
    }

    /// Same as [`AppState::with_store`] with an explicit time source
    pub fn with_store_and_clock<S>(
        config: AppConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PasswordError>
    where
        S: UserRepository + SessionRepository + ArticleRepository + CategoryRepository + 'static,
    {
        let tokens: Arc<dyn TokenManager> =
            Arc::new(JwtTokenManager::with_clock(&config.auth, clock.clone()));
        let hasher: Arc<dyn HashManager> =
            Arc::new(Argon2HashManager::new(&config.auth.password)?);

        let users = UserService::new(store.clone(), store.clone(), tokens, hasher, &config.auth)
            .with_clock(clock);
        let articles = ArticleService::new(store.clone(), store.clone());
        let categories = CategoryService::new(store);

        Ok(Self {
            config,
            users,
            articles,
            categories,
            database: None,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        })
    }

    /// Attach the PostgreSQL store used by the readiness probe
    pub fn with_database(mut self, database: PgStore) -> Self {
        self.database = Some(database);
        self
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
