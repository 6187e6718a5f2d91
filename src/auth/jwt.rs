//! JWT Token Handler
//! Mission: Issue and validate HS256 access/refresh tokens

use crate::auth::errors::TokenError;
use crate::auth::models::{Claims, TokenKind, User};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Fixed `iss` claim of every token this service mints
pub const TOKEN_ISSUER: &str = "easy-queue";

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: &str) -> Self {
        // Pinning the algorithm rejects `alg` swaps (e.g. RS256 with the
        // secret used as a public key).
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token of `kind` for `user`, valid from now for `ttl`
    pub fn issue(&self, user: &User, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(user, kind, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        user: &User,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Issuance("ttl out of range".to_string()))?;
        if ttl_secs <= 0 {
            return Err(TokenError::Issuance(
                "ttl must be at least one second".to_string(),
            ));
        }

        let iat = now.timestamp();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            kind,
            iss: TOKEN_ISSUER.to_string(),
            sub: user.id.to_string(),
            iat,
            exp: iat + ttl_secs,
            nbf: iat,
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            user_id = %user.id,
            kind = %kind,
            ttl_secs,
            "Issuing JWT"
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issuance(e.to_string()))
    }

    /// Validate signature, time window and kind, in that order
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed,
            })?;

        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        debug!(user_id = %claims.user_id, kind = %claims.kind, "Validated JWT");

        Ok(claims)
    }
}
