/// Password hashing and verification using Argon2id
///
/// Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
/// with a fresh 16-byte random salt each time, so hashing the same
/// password twice never yields the same string. Verification reads the cost
/// parameters back out of the stored hash, which keeps old hashes valid
/// after the configured costs change.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use blog_core::PasswordHashConfig;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidConfig(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Password does not match")]
    PasswordMismatch,
}

/// Hashes plaintext passwords and checks them against stored hashes
pub trait HashManager: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, PasswordError>;

    /// `Err(PasswordMismatch)` when the password is wrong
    fn verify_password(&self, password: &str, hash: &str) -> Result<(), PasswordError>;
}

/// Argon2id hash manager
pub struct Argon2HashManager {
    argon2: Argon2<'static>,
}

impl Argon2HashManager {
    /// Build a hasher, rejecting cost parameters Argon2 would refuse
    pub fn new(config: &PasswordHashConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl HashManager for Argon2HashManager {
    fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(PasswordError::PasswordMismatch),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}
