//! Password hashing via bcrypt.

use crate::error::AuthError;

/// Default bcrypt cost factor, matching what the service has always used.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Adaptive password hashing, swappable for tests.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError>;
}

/// bcrypt-backed hasher with a configurable work factor.
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(plaintext, hash)
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }
}
