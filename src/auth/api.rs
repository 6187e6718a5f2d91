//! Authentication API Endpoints
//! Mission: Provide login, token refresh and user management endpoints

use crate::api::{ApiError, AppState};
use crate::auth::models::{
    Claims, CreateUserRequest, LoginRequest, LoginResponse, RefreshTokenRequest,
    RefreshTokenResponse, UserResponse, UserRole,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let response = state.auth.login(&payload).await?;
    Ok(Json(response))
}

/// Refresh endpoint - POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let response = state.auth.refresh_token(&payload).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<UserRole>,
}

/// Identity carried by the access token - GET /auth/me
pub async fn me(Extension(claims): Extension<Claims>) -> Json<CurrentUser> {
    Json(CurrentUser {
        user_id: claims.user_id,
        email: claims.email,
        roles: claims.roles,
    })
}

/// Registration - POST /users
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(payload) = payload?;
    let user = state.users.register(&payload).await?;

    info!(user_id = %user.id, roles = ?user.roles, "User created via HTTP");

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let user = state.users.get_by_id(id).await?;
    Ok(Json(UserResponse::from_user(&user)))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// GET /users/by-email?email=
pub async fn get_user_by_email(
    State(state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Query(query) = query?;
    if query.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    let user = state.users.get_by_email(&query.email).await?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// List all users - GET /admin/users (Admin only)
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list().await?;
    info!(count = users.len(), "Listed all users");
    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}
