//! Security audit logging for authentication events
//!
//! Every account and session event is logged at INFO level on the `audit`
//! target as one structured record, so it can be filtered and routed apart
//! from application logs. Records carry the internal failure reason (for
//! example unknown email vs. wrong password) that is deliberately hidden
//! from API callers. Secrets and tokens never appear in an event.
//!
//! Author: hephaex@gmail.com

use blog_core::UserId;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Why a login was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailureReason {
    UnknownEmail,
    WrongPassword,
}

/// Why a refresh token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRejection {
    UnknownToken,
    Revoked,
    Expired,
    /// Another request revoked the session first
    LostRace,
    UserGone,
}

/// Security audit events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        user_id: UserId,
        username: String,
    },

    RegistrationFailure {
        username: String,
        reason: String,
    },

    LoginSuccess {
        user_id: UserId,
        session_id: Uuid,
    },

    LoginFailure {
        email: String,
        reason: LoginFailureReason,
    },

    TokenRefresh {
        user_id: UserId,
        old_session_id: Uuid,
        new_session_id: Uuid,
    },

    RefreshRejected {
        session_id: Option<Uuid>,
        reason: RefreshRejection,
    },

    Logout {
        user_id: UserId,
        session_id: Uuid,
    },

    PasswordChange {
        user_id: UserId,
        revoked_sessions: u64,
    },

    RoleElevated {
        user_id: UserId,
        role: String,
    },

    InvalidToken {
        reason: String,
        ip_address: Option<String>,
    },

    AccessDenied {
        user_id: UserId,
        resource: String,
        required_role: String,
    },
}

impl AuditEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "registration_success",
            AuditEvent::RegistrationFailure { .. } => "registration_failure",
            AuditEvent::LoginSuccess { .. } => "login_success",
            AuditEvent::LoginFailure { .. } => "login_failure",
            AuditEvent::TokenRefresh { .. } => "token_refresh",
            AuditEvent::RefreshRejected { .. } => "refresh_rejected",
            AuditEvent::Logout { .. } => "logout",
            AuditEvent::PasswordChange { .. } => "password_change",
            AuditEvent::RoleElevated { .. } => "role_elevated",
            AuditEvent::InvalidToken { .. } => "invalid_token",
            AuditEvent::AccessDenied { .. } => "access_denied",
        }
    }
}

/// Log a security audit event
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event_type = event.name(),
        event = %event_json,
        "Security event"
    );
}

/// Client IP from proxy headers, if any
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
