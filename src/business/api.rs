//! Business API Endpoints

use crate::api::{ApiError, AppState};
use crate::auth::models::Claims;
use crate::business::models::{Business, CreateBusinessRequest, UpdateBusinessRequest};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

/// POST /businesses (BusinessOwner)
pub async fn create_business(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateBusinessRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Business>), ApiError> {
    let Json(payload) = payload?;
    let business = state.businesses.create(claims.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(business)))
}

/// GET /businesses/:id
pub async fn get_business(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Business>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.businesses.get(id).await?))
}

/// PUT /businesses/:id (owner of the business)
pub async fn update_business(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBusinessRequest>, JsonRejection>,
) -> Result<Json<Business>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let business = state.businesses.update(id, claims.user_id, payload).await?;

    info!(business_id = %business.id, "Business updated via HTTP");
    Ok(Json(business))
}

/// DELETE /businesses/:id (owner of the business)
pub async fn delete_business(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.businesses.delete(id, claims.user_id).await?;

    info!(business_id = %id, "Business deleted via HTTP");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /businesses/mine (BusinessOwner)
pub async fn my_businesses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Business>>, ApiError> {
    Ok(Json(state.businesses.list_by_owner(claims.user_id).await?))
}

/// GET /admin/businesses (Admin)
pub async fn list_businesses(
    State(state): State<AppState>,
) -> Result<Json<Vec<Business>>, ApiError> {
    Ok(Json(state.businesses.list_all().await?))
}
