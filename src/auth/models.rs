//! Authentication Models
//! Mission: Define user identity, token claims and auth wire payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account as held by the user store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub phone: String,
    pub roles: Vec<UserRole>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh, active account. Timestamps are stamped now.
    pub fn new(email: &str, password_hash: String, phone: &str, roles: Vec<UserRole>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            phone: phone.to_string(),
            roles,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[serde(rename = "BO")]
    BusinessOwner,
    #[serde(rename = "CU")]
    Customer,
    #[serde(rename = "AD")]
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::BusinessOwner => "BO",
            UserRole::Customer => "CU",
            UserRole::Admin => "AD",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BO" => Some(UserRole::BusinessOwner),
            "CU" => Some(UserRole::Customer),
            "AD" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Which half of a token pair a JWT is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims payload
///
/// Roles are a snapshot taken at issuance; they are not re-read from the
/// store until the token pair is refreshed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<UserRole>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iss: String,
    pub sub: String, // subject (user_id)
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds until the access token expires
    pub user: UserResponse,
}

/// Refresh request body
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User response (sanitized)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub roles: Vec<UserRole>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub phone: String,
    pub roles: Vec<UserRole>,
}

impl CreateUserRequest {
    /// Shape checks done before any hashing or store access
    pub fn validate(&self) -> Result<(), &'static str> {
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err("email must be a valid address"),
        }
        if self.password.len() < 6 {
            return Err("password must be at least 6 characters");
        }
        if self.password.len() > 72 {
            return Err("password must be at most 72 bytes");
        }
        if self.phone.trim().is_empty() {
            return Err("phone is required");
        }
        if self.roles.is_empty() {
            return Err("at least one role is required");
        }
        // Admin accounts only come from the configured seed
        if self.roles.contains(&UserRole::Admin) {
            return Err("roles must be BO or CU");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str, roles: Vec<UserRole>) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            phone: "+5511999990000".to_string(),
            roles,
        }
    }

    #[test]
    fn test_user_role_serialization() {
        let owner = UserRole::BusinessOwner;
        let json = serde_json::to_string(&owner).unwrap();
        assert_eq!(json, r#""BO""#);

        let admin: UserRole = serde_json::from_str(r#""AD""#).unwrap();
        assert_eq!(admin, UserRole::Admin);
    }

    #[test]
    fn test_user_role_code_conversion() {
        assert_eq!(UserRole::Customer.as_str(), "CU");
        assert_eq!(UserRole::from_code("bo"), Some(UserRole::BusinessOwner));
        assert_eq!(UserRole::from_code(" AD "), Some(UserRole::Admin));
        assert_eq!(UserRole::from_code("root"), None);
    }

    #[test]
    fn test_token_kind_wire_format() {
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), r#""refresh""#);
        let kind: TokenKind = serde_json::from_str(r#""access""#).unwrap();
        assert_eq!(kind, TokenKind::Access);
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User::new(
            "alice@x.com",
            "$2b$04$secret".to_string(),
            "+5511",
            vec![UserRole::BusinessOwner],
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["roles"], serde_json::json!(["BO"]));

        let public = serde_json::to_value(UserResponse::from_user(&user)).unwrap();
        assert!(public.get("password_hash").is_none());
        assert_eq!(public["email"], "alice@x.com");
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration("alice@x.com", "secret123", vec![UserRole::Customer])
            .validate()
            .is_ok());
        assert!(registration("alice", "secret123", vec![UserRole::Customer])
            .validate()
            .is_err());
        assert!(registration("alice@x.com", "short", vec![UserRole::Customer])
            .validate()
            .is_err());
        assert!(registration("alice@x.com", &"p".repeat(73), vec![UserRole::Customer])
            .validate()
            .is_err());
        assert!(registration("alice@x.com", "secret123", vec![]).validate().is_err());
    }

    #[test]
    fn test_registration_rejects_admin_role() {
        assert_eq!(
            registration("eve@x.com", "secret123", vec![UserRole::Admin]).validate(),
            Err("roles must be BO or CU")
        );
        assert!(registration(
            "eve@x.com",
            "secret123",
            vec![UserRole::Customer, UserRole::Admin]
        )
        .validate()
        .is_err());
        assert!(registration(
            "bob@x.com",
            "secret123",
            vec![UserRole::BusinessOwner, UserRole::Customer]
        )
        .validate()
        .is_ok());
    }
}
