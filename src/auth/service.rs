//! Auth Service
//! Mission: Login, token refresh and token validation against the user store

use crate::auth::errors::{AuthError, TokenError};
use crate::auth::jwt::JwtHandler;
use crate::auth::models::{
    Claims, LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse, TokenKind,
    User, UserResponse,
};
use crate::auth::password::PasswordHasher;
use crate::auth::user_store::UserRepository;
use crate::config::JwtConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// Plaintext behind the hash verified for unknown emails
const DUMMY_PASSWORD: &str = "easy-queue-timing-equaliser";

/// Freshly minted access + refresh tokens. The two are not linked; each
/// refresh mints a completely new pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtHandler,
    hasher: PasswordHasher,
    access_ttl: Duration,
    refresh_ttl: Duration,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, config: &JwtConfig, hasher: PasswordHasher) -> Self {
        Self {
            users,
            jwt: JwtHandler::new(&config.secret),
            hasher,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Authenticate by email/password and mint a token pair.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`;
    /// only the logs tell them apart.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        info!("User login attempt");

        let email = req.email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            self.verify_dummy(&req.password).await;
            warn!("Login failed: user not found");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            warn!(user_id = %user.id, "Login failed: user is inactive");
            return Err(AuthError::AccountInactive);
        }

        let valid = match self
            .hasher
            .verify_blocking(user.password_hash.clone(), req.password.clone())
            .await
        {
            Ok(valid) => valid,
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Login failed: stored hash unusable");
                false
            }
        };
        if !valid {
            warn!(user_id = %user.id, "Login failed: invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user)?;

        info!(user_id = %user.id, "User logged in successfully");

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.access_ttl_secs(),
            user: UserResponse::from_user(&user),
        })
    }

    /// Trade a refresh token for a new pair, re-reading the user so that
    /// deactivation and role changes since issuance take effect.
    #[instrument(skip(self, req))]
    pub async fn refresh_token(
        &self,
        req: &RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, AuthError> {
        info!("Token refresh attempt");

        let claims = self
            .jwt
            .verify(&req.refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!(error = %e, "Token refresh failed: invalid refresh token");
                AuthError::InvalidRefreshToken
            })?;

        let Some(user) = self.users.find_by_id(claims.user_id).await? else {
            warn!(user_id = %claims.user_id, "Token refresh failed: user not found");
            return Err(AuthError::UserNotFound);
        };

        if !user.is_active {
            warn!(user_id = %user.id, "Token refresh failed: user is inactive");
            return Err(AuthError::AccountInactive);
        }

        let pair = self.issue_pair(&user)?;

        info!(user_id = %user.id, "Tokens refreshed successfully");

        Ok(RefreshTokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.access_ttl_secs(),
        })
    }

    /// Verify a token with the configured secret
    pub fn validate_token(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.jwt.verify(token, expected)
    }

    /// Both tokens come from the same user snapshot
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self
            .jwt
            .issue(user, TokenKind::Access, self.access_ttl)
            .inspect_err(|e| error!(error = %e, "Failed to generate access token"))?;
        let refresh_token = self
            .jwt
            .issue(user, TokenKind::Refresh, self.refresh_ttl)
            .inspect_err(|e| error!(error = %e, "Failed to generate refresh token"))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Spend one bcrypt verify at the configured cost, so an unknown email
    /// takes as long as a wrong password.
    async fn verify_dummy(&self, password: &str) {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hasher.hash_blocking(DUMMY_PASSWORD.to_string()))
            .await;
        match hash {
            Ok(hash) => {
                let _ = self
                    .hasher
                    .verify_blocking(hash.clone(), password.to_string())
                    .await;
            }
            Err(e) => error!(error = %e, "Failed to prepare dummy hash"),
        }
    }

    fn access_ttl_secs(&self) -> i64 {
        i64::try_from(self.access_ttl.as_secs()).unwrap_or(i64::MAX)
    }
}
