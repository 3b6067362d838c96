//! bcrypt password hashes.

use thiserror::Error;

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {0}")]
    InvalidCost(u32),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("unrecognized password hash format")]
    MalformedHash,
}

/// Hashes passwords with bcrypt at a fixed cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

/// Check `password` against a stored bcrypt hash of any cost.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, stored).map_err(|_| PasswordError::MalformedHash)
}
