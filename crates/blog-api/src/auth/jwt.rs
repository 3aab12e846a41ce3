//! Access and refresh token management
//!
//! Access tokens are HS256-signed JWTs carrying the user's id, email and
//! role. Refresh tokens are opaque 256-bit random strings; only their SHA-256
//! digest is ever persisted.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use blog_core::{AuthConfig, Clock, Role, SystemClock, UserId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::models::AuthPrincipal;

/// Refresh tokens carry this many random bytes
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Claims embedded in every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - decimal user id
    pub sub: String,
    /// Unique token id (UUID v4)
    pub jti: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub email: String,
    pub role: Role,
}

/// Token errors
///
/// `Parse` and `Invalid` mean the caller presented a bad token; everything
/// else is a server-side failure.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("failed to parse token: {0}")]
    Parse(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),

    #[error("random source unavailable: {0}")]
    Entropy(#[source] rand::Error),
}

impl TokenError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TokenError::Parse(_) | TokenError::Invalid(_))
    }
}

/// A signed access token and the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A fresh refresh token and the digest to store for it
#[derive(Clone)]
pub struct RefreshToken {
    pub token: String,
    pub hash: String,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("token", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}

/// Issues and verifies tokens
pub trait TokenManager: Send + Sync {
    fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
    ) -> Result<AccessToken, TokenError>;

    fn verify_access_token(&self, token: &str) -> Result<AuthPrincipal, TokenError>;

    fn issue_refresh_token(&self) -> Result<RefreshToken, TokenError>;

    fn hash_refresh_token(&self, token: &str) -> String;
}

/// Lowercase hex SHA-256 of a refresh token
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// HS256 token manager
pub struct JwtTokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtTokenManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        // Only HS256 is accepted. Expiry is checked against the injected
        // clock instead of the library's wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            access_ttl: config.access_token_ttl(),
            clock,
        }
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        JwtErrorKind::InvalidToken
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => TokenError::Parse(err.to_string()),
        JwtErrorKind::InvalidSignature
        | JwtErrorKind::InvalidAlgorithm
        | JwtErrorKind::InvalidAlgorithmName
        | JwtErrorKind::ExpiredSignature
        | JwtErrorKind::ImmatureSignature
        | JwtErrorKind::InvalidIssuer
        | JwtErrorKind::InvalidAudience
        | JwtErrorKind::InvalidSubject
        | JwtErrorKind::MissingRequiredClaim(_) => TokenError::Invalid(err.to_string()),
        _ => TokenError::Verification(err),
    }
}

impl TokenManager for JwtTokenManager {
    fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
    ) -> Result<AccessToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.access_ttl;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            email: email.to_string(),
            role,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        // Report the second-truncated expiry actually written into the token
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(AccessToken { token, expires_at })
    }

    fn verify_access_token(&self, token: &str) -> Result<AuthPrincipal, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(classify)?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Invalid("token has expired".to_string()));
        }

        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| TokenError::Invalid("subject is not a user id".to_string()))?;

        Ok(AuthPrincipal {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }

    fn issue_refresh_token(&self) -> Result<RefreshToken, TokenError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes).map_err(TokenError::Entropy)?;

        let token = URL_SAFE_NO_PAD.encode(bytes);
        let hash = hash_refresh_token(&token);
        Ok(RefreshToken { token, hash })
    }

    fn hash_refresh_token(&self, token: &str) -> String {
        hash_refresh_token(token)
    }
}
