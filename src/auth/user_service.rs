//! User Service
//! Mission: Registration, lookups and admin bootstrap on top of the user store

use crate::auth::errors::CredentialError;
use crate::auth::models::{CreateUserRequest, User, UserRole};
use crate::auth::password::PasswordHasher;
use crate::auth::rbac::RoleHolder;
use crate::auth::user_store::UserRepository;
use crate::config::AdminSeed;
use crate::db::StoreError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("email is already registered")]
    EmailTaken,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UserServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => UserServiceError::EmailTaken,
            StoreError::EmptyRoleSet => UserServiceError::Invalid("at least one role is required"),
            StoreError::NotFound => UserServiceError::NotFound,
            other => UserServiceError::Store(other),
        }
    }
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Create an active account. The password is hashed off the async runtime.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: &CreateUserRequest) -> Result<User, UserServiceError> {
        req.validate().map_err(UserServiceError::Invalid)?;

        let email = req.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = self.hasher.hash_blocking(req.password.clone()).await?;

        let mut roles: Vec<UserRole> = Vec::with_capacity(req.roles.len());
        for role in &req.roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        let user = User::new(&email, password_hash, req.phone.trim(), roles);
        self.users.create(&user).await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User, UserServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, UserServiceError> {
        self.users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.users.list().await?)
    }

    /// Make sure the configured administrator exists. Returns `true` when a
    /// new account was created. An existing account is left untouched.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<bool, UserServiceError> {
        let email = seed.email.trim().to_lowercase();
        if let Some(existing) = self.users.find_by_email(&email).await? {
            if !existing.has_role(UserRole::Admin) {
                warn!(user_id = %existing.id, "Seed admin email belongs to a non-admin account");
            }
            return Ok(false);
        }

        let password_hash = self.hasher.hash_blocking(seed.password.clone()).await?;
        let admin = User::new(&email, password_hash, "", vec![UserRole::Admin]);
        self.users.create(&admin).await?;

        info!(user_id = %admin.id, email = %admin.email, "Seeded admin account");
        Ok(true)
    }
}
