//! Password Hashing
//! Mission: One-way bcrypt hashing with an embedded per-hash salt

use crate::auth::errors::CredentialError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt hasher with a configurable cost factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password. Each call draws a fresh salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(CredentialError::Hashing(format!(
                "password exceeds {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        hash(plaintext, self.cost).map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// `Ok(false)` on mismatch; `Err` only when `stored_hash` cannot be parsed.
    pub fn verify(&self, stored_hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
        verify(plaintext, stored_hash).map_err(|e| CredentialError::Verification(e.to_string()))
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, CredentialError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(
        &self,
        stored_hash: String,
        plaintext: String,
    ) -> Result<bool, CredentialError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&stored_hash, &plaintext))
            .await
            .map_err(|e| CredentialError::Verification(e.to_string()))?
    }
}
