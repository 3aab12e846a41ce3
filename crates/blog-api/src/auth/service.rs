//! Account and session service
//!
//! Registration, login, refresh-token rotation, logout, password change and
//! role elevation. Every failure is a [`BlogError`] naming the operation;
//! storage and crypto failures collapse to `Internal` after being logged.
//!
//! Refresh tokens rotate strictly: a refresh revokes the presented session
//! with a conditional update before anything new is issued, so of two
//! concurrent refreshes with the same token exactly one succeeds.

use std::error::Error as StdError;
use std::sync::Arc;

use blog_core::user::{
    normalize_email, normalize_username, validate_email, validate_password, validate_username,
};
use blog_core::{
    AuthConfig, BlogError, Clock, ErrorKind, NewUser, RepositoryError, Result, Role, Session,
    SessionRepository, SessionState, SystemClock, User, UserId, UserPublic, UserRepository,
};
use chrono::Duration;
use tracing::{debug, error, info, warn};

use super::jwt::{TokenError, TokenManager};
use super::models::{AuthPrincipal, AuthSession, SignUpRequest, UpdateUserRequest};
use super::password::{HashManager, PasswordError};
use crate::audit::{audit_log, AuditEvent, LoginFailureReason, RefreshRejection};

/// Log an unexpected failure and hide it behind `Internal`
fn internal(op: &'static str, err: impl Into<Box<dyn StdError + Send + Sync>>) -> BlogError {
    let err = err.into();
    error!(op, error = %err, "internal failure");
    BlogError::with_source(op, ErrorKind::Internal, err)
}

/// Map user write failures, translating late unique violations
fn user_write_error(op: &'static str, err: RepositoryError) -> BlogError {
    match err {
        RepositoryError::UsernameDuplicate => BlogError::new(op, ErrorKind::UsernameExists),
        RepositoryError::EmailDuplicate => BlogError::new(op, ErrorKind::EmailExists),
        RepositoryError::NotFound => BlogError::new(op, ErrorKind::UserNotFound),
        other => internal(op, other),
    }
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    tokens: Arc<dyn TokenManager>,
    hasher: Arc<dyn HashManager>,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
    revoke_sessions_on_password_change: bool,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        tokens: Arc<dyn TokenManager>,
        hasher: Arc<dyn HashManager>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher,
            clock: Arc::new(SystemClock),
            refresh_ttl: config.refresh_token_ttl(),
            revoke_sessions_on_password_change: config.revoke_sessions_on_password_change,
        }
    }

    /// Use a different time source for session expiry
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a new account with the `user` role
    pub async fn create_user(&self, request: SignUpRequest) -> Result<UserPublic> {
        const OP: &str = "UserService::create_user";

        let username = normalize_username(&request.username);
        let email = normalize_email(&request.email);

        validate_username(&username)
            .and_then(|_| validate_email(&email))
            .and_then(|_| validate_password(&request.password))
            .map_err(|kind| self.registration_failed(OP, &username, kind))?;

        self.users
            .ensure_available(&email, &username)
            .await
            .map_err(|e| self.registration_write_failed(OP, &username, e))?;

        let password_hash = self.hash_password(OP, &request.password).await?;

        // A concurrent sign-up can still win between the check and the insert
        let user = self
            .users
            .create(&NewUser {
                username: username.clone(),
                email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| self.registration_write_failed(OP, &username, e))?;

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            username: user.username.clone(),
        });
        info!(user_id = user.id, "User registered");

        Ok(user.to_public())
    }

    fn registration_failed(&self, op: &'static str, username: &str, kind: ErrorKind) -> BlogError {
        audit_log(&AuditEvent::RegistrationFailure {
            username: username.to_string(),
            reason: kind.to_string(),
        });
        BlogError::new(op, kind)
    }

    fn registration_write_failed(
        &self,
        op: &'static str,
        username: &str,
        err: RepositoryError,
    ) -> BlogError {
        match err {
            RepositoryError::UsernameDuplicate => {
                self.registration_failed(op, username, ErrorKind::UsernameExists)
            }
            RepositoryError::EmailDuplicate => {
                self.registration_failed(op, username, ErrorKind::EmailExists)
            }
            other => internal(op, other),
        }
    }

    /// Exchange credentials for a new session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        const OP: &str = "UserService::login";

        let email = normalize_email(email);
        let user = match self.users.get_by_email(&email).await.map_err(|e| internal(OP, e))? {
            Some(user) => user,
            None => {
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: LoginFailureReason::UnknownEmail,
                });
                return Err(BlogError::new(OP, ErrorKind::InvalidCredentials));
            }
        };

        match self.verify_password(password, &user.password_hash).await {
            Ok(()) => {}
            Err(PasswordError::PasswordMismatch) => {
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: LoginFailureReason::WrongPassword,
                });
                return Err(BlogError::new(OP, ErrorKind::InvalidCredentials));
            }
            Err(e) => return Err(internal(OP, e)),
        }

        let session = self.open_session(OP, &user).await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            session_id: session.session_id,
        });

        Ok(session)
    }

    /// Rotate a refresh token: revoke its session and open a new one
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        const OP: &str = "UserService::refresh_session";

        let session = self.find_active_session(OP, refresh_token).await?;
        self.revoke_session(OP, &session).await?;

        // The user may have been deleted or changed since the session began
        let user = match self
            .users
            .get_by_id(session.user_id)
            .await
            .map_err(|e| internal(OP, e))?
        {
            Some(user) => user,
            None => return Err(self.refresh_rejected(OP, Some(&session), RefreshRejection::UserGone)),
        };

        let next = self.open_session(OP, &user).await?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            old_session_id: session.id,
            new_session_id: next.session_id,
        });

        Ok(next)
    }

    /// Revoke the session behind a refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        const OP: &str = "UserService::logout";

        let session = self.find_active_session(OP, refresh_token).await?;
        self.revoke_session(OP, &session).await?;

        audit_log(&AuditEvent::Logout {
            user_id: session.user_id,
            session_id: session.id,
        });

        Ok(())
    }

    /// Replace the password after checking the current one
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        const OP: &str = "UserService::change_password";

        validate_password(new_password).map_err(|kind| BlogError::new(OP, kind))?;
        let mut user = self.require_user(OP, user_id).await?;

        match self.verify_password(old_password, &user.password_hash).await {
            Ok(()) => {}
            Err(PasswordError::PasswordMismatch) => {
                return Err(BlogError::new(OP, ErrorKind::InvalidCredentials))
            }
            Err(e) => return Err(internal(OP, e)),
        }

        // The old password just verified, so it is the stored one
        if old_password == new_password {
            return Err(BlogError::new(OP, ErrorKind::PasswordUnchanged));
        }

        let password_hash = self.hash_password(OP, new_password).await?;
        user.change_password_hash(password_hash)
            .map_err(|kind| BlogError::new(OP, kind))?;
        self.users
            .update(&user)
            .await
            .map_err(|e| user_write_error(OP, e))?;

        let revoked_sessions = if self.revoke_sessions_on_password_change {
            self.sessions
                .revoke_all_for_user(user_id)
                .await
                .map_err(|e| internal(OP, e))?
        } else {
            0
        };

        audit_log(&AuditEvent::PasswordChange {
            user_id,
            revoked_sessions,
        });

        Ok(())
    }

    /// Grant the admin role
    pub async fn set_admin_role(&self, user_id: UserId) -> Result<UserPublic> {
        const OP: &str = "UserService::set_admin_role";

        let mut user = self.require_user(OP, user_id).await?;
        user.promote_to_admin()
            .map_err(|kind| BlogError::new(OP, kind))?;
        self.users
            .update(&user)
            .await
            .map_err(|e| user_write_error(OP, e))?;

        audit_log(&AuditEvent::RoleElevated {
            user_id,
            role: user.role.to_string(),
        });

        Ok(user.to_public())
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<UserPublic> {
        const OP: &str = "UserService::get_user";
        Ok(self.require_user(OP, user_id).await?.to_public())
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<UserPublic> {
        const OP: &str = "UserService::get_user_by_username";

        self.users
            .get_by_username(&normalize_username(username))
            .await
            .map_err(|e| internal(OP, e))?
            .map(|user| user.to_public())
            .ok_or_else(|| BlogError::new(OP, ErrorKind::UserNotFound))
    }

    /// Change username and/or email
    pub async fn update_user(
        &self,
        user_id: UserId,
        request: UpdateUserRequest,
    ) -> Result<UserPublic> {
        const OP: &str = "UserService::update_user";

        if request.username.is_none() && request.email.is_none() {
            return Err(BlogError::new(OP, ErrorKind::NoDataToUpdate));
        }

        let mut user = self.require_user(OP, user_id).await?;
        if let Some(username) = &request.username {
            user.change_username(username)
                .map_err(|kind| BlogError::new(OP, kind))?;
        }
        if let Some(email) = &request.email {
            user.change_email(email)
                .map_err(|kind| BlogError::new(OP, kind))?;
        }

        self.users
            .update(&user)
            .await
            .map_err(|e| user_write_error(OP, e))?;

        info!(user_id, "User profile updated");
        Ok(user.to_public())
    }

    /// Verify an access token presented by a client
    pub fn verify_access_token(&self, token: &str) -> Result<AuthPrincipal> {
        const OP: &str = "UserService::verify_access_token";

        self.tokens.verify_access_token(token).map_err(|e| {
            if e.is_unauthorized() {
                debug!(error = %e, "Access token rejected");
                BlogError::with_source(OP, ErrorKind::Unauthorized, e)
            } else {
                internal(OP, e)
            }
        })
    }

    async fn require_user(&self, op: &'static str, user_id: UserId) -> Result<User> {
        self.users
            .get_by_id(user_id)
            .await
            .map_err(|e| internal(op, e))?
            .ok_or_else(|| BlogError::new(op, ErrorKind::UserNotFound))
    }

    /// Issue an access token and a refresh token backed by a new session
    async fn open_session(&self, op: &'static str, user: &User) -> Result<AuthSession> {
        let token_error = |e: TokenError| internal(op, e);

        let access = self
            .tokens
            .issue_access_token(user.id, &user.email, user.role)
            .map_err(token_error)?;
        let refresh = self.tokens.issue_refresh_token().map_err(token_error)?;

        let session = Session::new(user.id, refresh.hash, self.clock.now(), self.refresh_ttl);
        self.sessions.create(&session).await.map_err(|e| match e {
            RepositoryError::TokenHashDuplicate => {
                error!(op, user_id = user.id, "Refresh token hash collision");
                BlogError::with_source(op, ErrorKind::RefreshTokenHashDuplicate, e)
            }
            other => internal(op, other),
        })?;

        Ok(AuthSession {
            session_id: session.id,
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_token_expires_at: session.expires_at,
            user: user.to_public(),
        })
    }

    /// Look up the session for a refresh token; it must be live right now
    async fn find_active_session(&self, op: &'static str, refresh_token: &str) -> Result<Session> {
        let hash = self.tokens.hash_refresh_token(refresh_token);
        let session = match self
            .sessions
            .get_by_refresh_token_hash(&hash)
            .await
            .map_err(|e| internal(op, e))?
        {
            Some(session) => session,
            None => return Err(self.refresh_rejected(op, None, RefreshRejection::UnknownToken)),
        };

        match session.state_at(self.clock.now()) {
            SessionState::Active => Ok(session),
            SessionState::Revoked => {
                warn!(
                    session_id = %session.id,
                    user_id = session.user_id,
                    "Revoked refresh token presented again"
                );
                Err(self.refresh_rejected(op, Some(&session), RefreshRejection::Revoked))
            }
            SessionState::Expired => {
                Err(self.refresh_rejected(op, Some(&session), RefreshRejection::Expired))
            }
        }
    }

    /// Conditionally revoke; losing to a concurrent revoker is `Unauthorized`
    async fn revoke_session(&self, op: &'static str, session: &Session) -> Result<()> {
        match self.sessions.revoke(session.id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::AlreadyRevoked | RepositoryError::NotFound) => {
                Err(self.refresh_rejected(op, Some(session), RefreshRejection::LostRace))
            }
            Err(e) => Err(internal(op, e)),
        }
    }

    fn refresh_rejected(
        &self,
        op: &'static str,
        session: Option<&Session>,
        reason: RefreshRejection,
    ) -> BlogError {
        audit_log(&AuditEvent::RefreshRejected {
            session_id: session.map(|s| s.id),
            reason,
        });
        BlogError::new(op, ErrorKind::Unauthorized)
    }

    async fn hash_password(&self, op: &'static str, password: &str) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| internal(op, e))?
            .map_err(|e| internal(op, e))
    }

    async fn verify_password(
        &self,
        password: &str,
        hash: &str,
    ) -> std::result::Result<(), PasswordError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
    }
}
