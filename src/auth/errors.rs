//! Authentication error taxonomy
//!
//! Token and credential failures carry enough detail for logs; the HTTP layer
//! collapses them into uniform 401 responses so clients cannot tell a missing
//! account from a wrong password, or an expired token from a forged one.

use crate::auth::models::TokenKind;
use crate::db::StoreError;
use thiserror::Error;

/// Token validation family
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("wrong token kind: expected {expected}, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("failed to issue token: {0}")]
    Issuance(String),
}

/// Credential family
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("stored password hash is unusable: {0}")]
    Verification(String),
}

/// Errors surfaced by the auth service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user account is inactive")]
    AccountInactive,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("insufficient permissions")]
    Forbidden,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}
