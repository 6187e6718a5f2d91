//! HTTP error mapping
//!
//! Every failure leaves the service as `{"error": <code>, "message": <text>}`.
//! Token problems never say which check failed, and server-side failures are
//! only described in the logs.

use crate::auth::errors::AuthError;
use crate::auth::user_service::UserServiceError;
use crate::business::BusinessError;
use crate::whatsapp::errors::WhatsAppError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    MissingToken,
    InvalidAuthHeader,
    InvalidToken,
    Unauthenticated,
    InvalidCredentials,
    AccountInactive,
    InvalidRefreshToken,
    UserNotFound,
    Forbidden(String),
    BadRequest(String),
    NotFound(&'static str),
    Conflict(&'static str),
    ServiceUnavailable(&'static str),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing authorization header".to_string(),
            ),
            ApiError::InvalidAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid authorization format. Use: Bearer {token}".to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "invalid or expired token".to_string(),
            ),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "authentication required".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "invalid credentials".to_string(),
            ),
            ApiError::AccountInactive => (
                StatusCode::UNAUTHORIZED,
                "account_inactive",
                "user account is inactive".to_string(),
            ),
            ApiError::InvalidRefreshToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_refresh_token",
                "invalid or expired refresh token".to_string(),
            ),
            ApiError::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "user_not_found",
                "user not found".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.to_string()),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.to_string(),
            ),
            ApiError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "upstream service request failed".to_string(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => error!(error = %detail, "Request failed"),
            ApiError::BadGateway(detail) => error!(error = %detail, "Upstream request failed"),
            _ => {}
        }

        let (status, code, message) = self.parts();
        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Credential(_) => ApiError::InvalidCredentials,
            AuthError::AccountInactive => ApiError::AccountInactive,
            AuthError::InvalidRefreshToken => ApiError::InvalidRefreshToken,
            AuthError::UserNotFound => ApiError::UserNotFound,
            AuthError::Token(_) => ApiError::InvalidToken,
            AuthError::Forbidden => ApiError::Forbidden("insufficient permissions".to_string()),
            AuthError::Store(e) => ApiError::Internal(e.to_string()),
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Invalid(msg) => ApiError::BadRequest(msg.to_string()),
            UserServiceError::EmailTaken => ApiError::Conflict("email is already registered"),
            UserServiceError::NotFound => ApiError::NotFound("user not found"),
            UserServiceError::Credential(e) => ApiError::Internal(e.to_string()),
            UserServiceError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<BusinessError> for ApiError {
    fn from(err: BusinessError) -> Self {
        match err {
            BusinessError::Invalid(msg) => ApiError::BadRequest(msg.to_string()),
            BusinessError::OwnerNotFound => {
                ApiError::Forbidden("owner user not found".to_string())
            }
            BusinessError::NotBusinessOwner => ApiError::Forbidden(
                "user must have Business Owner role to create a business".to_string(),
            ),
            BusinessError::NotOwner => ApiError::Forbidden(
                "you are not authorized to modify this business".to_string(),
            ),
            BusinessError::NotFound => ApiError::NotFound("business not found"),
            BusinessError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<WhatsAppError> for ApiError {
    fn from(err: WhatsAppError) -> Self {
        match err {
            WhatsAppError::Invalid(msg) => ApiError::BadRequest(msg.to_string()),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
