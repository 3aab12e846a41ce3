//! Error taxonomy
//!
//! Every failure a service can report is an [`ErrorKind`]. A kind is a plain
//! sentinel: callers compare against it, the HTTP layer maps its
//! [`ErrorClass`] to a status code. [`BlogError`] carries the kind together
//! with the name of the operation that failed and an optional source, and
//! keeps the kind inspectable no matter how many times it is wrapped.

use std::error::Error as StdError;
use thiserror::Error;

/// Broad category of an [`ErrorKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Input failed a shape or content rule
    Validation,
    /// Request conflicts with current state (duplicates, no-op changes)
    Conflict,
    /// Caller could not be authenticated
    Authentication,
    /// Caller is authenticated but not allowed
    Forbidden,
    /// Referenced entity does not exist
    NotFound,
    /// Anything the caller cannot fix
    Internal,
}

/// Sentinel error kinds shared by all services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    // Validation
    #[error("username is empty")]
    UsernameEmpty,
    #[error("username is too short")]
    UsernameTooShort,
    #[error("username is too long")]
    UsernameTooLong,
    #[error("username must not contain spaces")]
    UsernameHasSpaces,
    #[error("username contains invalid characters")]
    UsernameInvalidChars,
    #[error("username is reserved")]
    UsernameForbidden,
    #[error("email is too short")]
    EmailTooShort,
    #[error("email is too long")]
    EmailTooLong,
    #[error("email must not contain spaces")]
    EmailHasSpaces,
    #[error("email is not a valid address")]
    EmailInvalidFormat,
    #[error("password is too short")]
    PasswordTooShort,
    #[error("password is too long")]
    PasswordTooLong,
    #[error("password must not contain whitespace")]
    PasswordHasSpaces,
    #[error("invalid role")]
    InvalidRole,
    #[error("title is too short")]
    TitleTooShort,
    #[error("title is too long")]
    TitleTooLong,
    #[error("title must not contain html")]
    TitleHasHtml,
    #[error("content is too short")]
    ContentTooShort,
    #[error("content is too long")]
    ContentTooLong,
    #[error("content must not contain scripts")]
    ContentHasScript,
    #[error("category name is too short")]
    CategoryNameTooShort,
    #[error("category name is too long")]
    CategoryNameTooLong,
    #[error("no data to update")]
    NoDataToUpdate,

    // Conflict
    #[error("username already exists")]
    UsernameExists,
    #[error("email already exists")]
    EmailExists,
    #[error("new username is the same as the current one")]
    UsernameUnchanged,
    #[error("new email is the same as the current one")]
    EmailUnchanged,
    #[error("new password is the same as the current one")]
    PasswordUnchanged,
    #[error("user is already an admin")]
    AlreadyAdmin,
    #[error("category already exists")]
    CategoryExists,
    #[error("new category name is the same as the current one")]
    CategoryUnchanged,
    #[error("category still has articles")]
    CategoryInUse,
    #[error("article is unchanged")]
    ArticleUnchanged,

    // Authentication
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,

    // Forbidden
    #[error("permission denied")]
    PermissionDenied,
    #[error("only the author may modify this article")]
    NotAuthor,

    // Not found
    #[error("user not found")]
    UserNotFound,
    #[error("article not found")]
    ArticleNotFound,
    #[error("category not found")]
    CategoryNotFound,

    // Internal
    #[error("refresh token hash collision")]
    RefreshTokenHashDuplicate,
    #[error("internal error")]
    Internal,
}

impl ErrorKind {
    pub fn class(self) -> ErrorClass {
        use ErrorKind::*;
        match self {
            UsernameEmpty | UsernameTooShort | UsernameTooLong | UsernameHasSpaces
            | UsernameInvalidChars | UsernameForbidden | EmailTooShort | EmailTooLong
            | EmailHasSpaces | EmailInvalidFormat | PasswordTooShort | PasswordTooLong
            | PasswordHasSpaces | InvalidRole | TitleTooShort | TitleTooLong | TitleHasHtml
            | ContentTooShort | ContentTooLong | ContentHasScript | CategoryNameTooShort
            | CategoryNameTooLong | NoDataToUpdate => ErrorClass::Validation,

            UsernameExists | EmailExists | UsernameUnchanged | EmailUnchanged
            | PasswordUnchanged | AlreadyAdmin | CategoryExists | CategoryUnchanged
            | CategoryInUse | ArticleUnchanged => ErrorClass::Conflict,

            InvalidCredentials | Unauthorized => ErrorClass::Authentication,

            PermissionDenied | NotAuthor => ErrorClass::Forbidden,

            UserNotFound | ArticleNotFound | CategoryNotFound => ErrorClass::NotFound,

            RefreshTokenHashDuplicate | Internal => ErrorClass::Internal,
        }
    }

    /// Stable machine-readable code, e.g. `USERNAME_EXISTS`
    pub fn code(self) -> String {
        let name = format!("{self:?}");
        let mut code = String::with_capacity(name.len() + 4);
        for (i, ch) in name.chars().enumerate() {
            if ch.is_ascii_uppercase() && i > 0 {
                code.push('_');
            }
            code.push(ch.to_ascii_uppercase());
        }
        code
    }
}

/// Error returned by every service operation
#[derive(Debug, Error)]
#[error("{op}: {kind}")]
pub struct BlogError {
    op: &'static str,
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl BlogError {
    pub fn new(op: &'static str, kind: ErrorKind) -> Self {
        Self {
            op,
            kind,
            source: None,
        }
    }

    pub fn with_source(
        op: &'static str,
        kind: ErrorKind,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            op,
            kind,
            source: Some(source.into()),
        }
    }

    /// Wrap this error with an outer operation name, keeping its kind.
    pub fn context(self, op: &'static str) -> Self {
        let kind = self.kind;
        Self {
            op,
            kind,
            source: Some(Box::new(self)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
