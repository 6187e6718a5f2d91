//! Authentication Module
//! Mission: Secure API access with JWT tokens, bcrypt credentials and RBAC

pub mod api;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rbac;
pub mod service;
pub mod user_service;
pub mod user_store;

pub use errors::{AuthError, CredentialError, TokenError};
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, require_admin, require_business_owner};
pub use models::{Claims, TokenKind, User, UserRole};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use user_service::{UserService, UserServiceError};
pub use user_store::{SqliteUserStore, UserRepository};
