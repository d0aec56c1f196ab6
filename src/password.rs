use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PasswordError {
    /// The raw password breaks the length/blank policy. The message is user-facing.
    #[error("{0}")]
    Policy(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// PasswordManager
///
/// Salted password hashing. Every `encode` draws a fresh random salt, so the same
/// password never produces the same stored value twice; `matches` re-hashes the raw
/// password with the salt embedded in the stored PHC string and compares digests.
#[derive(Clone, Debug)]
pub struct PasswordManager {
    min_length: usize,
    max_length: usize,
}

impl PasswordManager {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.password_min_length, config.password_max_length)
    }

    /// Rejects blank passwords (including non-breaking spaces) and lengths outside the
    /// configured range. Length counts characters, not bytes.
    pub fn check_policy(&self, password: &str) -> Result<(), PasswordError> {
        let length = password.chars().count();
        if password.trim().is_empty() || length < self.min_length || length > self.max_length {
            return Err(PasswordError::Policy(format!(
                "Password should not be empty and must have at least {} but no more than {} characters.",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }

    pub fn encode(&self, password: &str) -> Result<String, PasswordError> {
        self.check_policy(password)?;
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// A stored value that does not parse as a PHC string never matches.
    pub fn matches(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("stored password hash is unreadable: {}", e);
                false
            }
        }
    }
}
