//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation and role gates

use crate::api::ApiError;
use crate::auth::models::{Claims, TokenKind, UserRole};
use crate::auth::rbac;
use crate::auth::service::AuthService;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Validates the bearer access token and stores its claims on the request
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?;
    let value = header.to_str().map_err(|_| ApiError::InvalidAuthHeader)?;
    let token = bearer_token(value).ok_or(ApiError::InvalidAuthHeader)?;

    // Refresh tokens are rejected here as WrongKind
    let claims = auth
        .validate_token(token, TokenKind::Access)
        .map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::InvalidToken
        })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Route layer for BusinessOwner-only endpoints
pub async fn require_business_owner(req: Request, next: Next) -> Result<Response, ApiError> {
    require_roles(&[UserRole::BusinessOwner], req, next).await
}

/// Route layer for Admin-only endpoints
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    require_roles(&[UserRole::Admin], req, next).await
}

async fn require_roles(roles: &[UserRole], req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = extract_claims(&req).ok_or(ApiError::Unauthenticated)?;

    if rbac::require_any_role(claims, roles).is_err() {
        warn!(
            user_id = %claims.user_id,
            required = ?roles,
            held = ?claims.roles,
            "Access denied: missing role"
        );
        return Err(ApiError::Forbidden("insufficient permissions".to_string()));
    }

    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
