//! Refresh-token sessions
//!
//! A session row is created on login and on every refresh. Only the SHA-256
//! hash of the refresh token is kept. A session is usable while it is not
//! revoked and the current time is strictly before `expires_at`; expiry is
//! never written back, the row simply stops being valid.

use crate::user::UserId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: UserId,
    pub refresh_token_hash: String,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Usability of a session at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Revoked,
    Expired,
}

impl Session {
    pub fn new(
        user_id: UserId,
        refresh_token_hash: String,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash,
            is_revoked: false,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Revocation wins over expiry when both apply.
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_revoked {
            SessionState::Revoked
        } else if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}
