//! User accounts and their input rules

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::ValidateEmail;

pub type UserId = i64;

pub const USERNAME_MIN_LEN: usize = 5;
pub const USERNAME_MAX_LEN: usize = 32;
pub const EMAIL_MIN_LEN: usize = 3;
pub const EMAIL_MAX_LEN: usize = 320;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Usernames that could be mistaken for staff or system accounts
pub const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "support",
    "moderator",
    "superuser",
    "webmaster",
    "postmaster",
    "hostmaster",
    "security",
    "official",
    "staff",
    "owner",
    "anonymous",
    "undefined",
];

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(ErrorKind::InvalidRole),
        }
    }
}

/// Stored user record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// User as exposed to other users (no password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    pub fn change_username(&mut self, username: &str) -> Result<(), ErrorKind> {
        let username = normalize_username(username);
        if username == self.username {
            return Err(ErrorKind::UsernameUnchanged);
        }
        validate_username(&username)?;
        self.username = username;
        Ok(())
    }

    pub fn change_email(&mut self, email: &str) -> Result<(), ErrorKind> {
        let email = normalize_email(email);
        if email == self.email {
            return Err(ErrorKind::EmailUnchanged);
        }
        validate_email(&email)?;
        self.email = email;
        Ok(())
    }

    pub fn change_password_hash(&mut self, password_hash: String) -> Result<(), ErrorKind> {
        if password_hash == self.password_hash {
            return Err(ErrorKind::PasswordUnchanged);
        }
        self.password_hash = password_hash;
        Ok(())
    }

    pub fn promote_to_admin(&mut self) -> Result<(), ErrorKind> {
        if self.role.is_admin() {
            return Err(ErrorKind::AlreadyAdmin);
        }
        self.role = Role::Admin;
        Ok(())
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Emails compare case-insensitively, so they are stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check a (normalized) username against the shape rules and the denylist.
pub fn validate_username(username: &str) -> Result<(), ErrorKind> {
    if username.is_empty() {
        return Err(ErrorKind::UsernameEmpty);
    }
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(ErrorKind::UsernameTooShort);
    }
    if len > USERNAME_MAX_LEN {
        return Err(ErrorKind::UsernameTooLong);
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ErrorKind::UsernameHasSpaces);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ErrorKind::UsernameInvalidChars);
    }
    let lowered = username.to_ascii_lowercase();
    if RESERVED_USERNAMES.contains(&lowered.as_str()) {
        return Err(ErrorKind::UsernameForbidden);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ErrorKind> {
    let len = email.chars().count();
    if len < EMAIL_MIN_LEN {
        return Err(ErrorKind::EmailTooShort);
    }
    if len > EMAIL_MAX_LEN {
        return Err(ErrorKind::EmailTooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ErrorKind::EmailHasSpaces);
    }
    if !email.validate_email() {
        return Err(ErrorKind::EmailInvalidFormat);
    }
    Ok(())
}

/// Length is measured in bytes, which bounds the work done by the hasher.
pub fn validate_password(password: &str) -> Result<(), ErrorKind> {
    if password.chars().any(char::is_whitespace) {
        return Err(ErrorKind::PasswordHasSpaces);
    }
    if password.len() < PASSWORD_MIN_LEN {
        return Err(ErrorKind::PasswordTooShort);
    }
    if password.len() > PASSWORD_MAX_LEN {
        return Err(ErrorKind::PasswordTooLong);
    }
    Ok(())
}
