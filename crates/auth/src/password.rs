//! Password hashing (bcrypt).

use thiserror::Error;

use depot_core::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// bcrypt hasher with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// `cost` is clamped to the range bcrypt accepts (4..=31).
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    /// `Ok(false)` for a wrong password. A malformed stored hash is an error.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(bcrypt::verify(plain, hash)?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

/// Minimal strength rule for passwords chosen by users.
pub fn validate_new_password(plain: &str) -> DomainResult<()> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
