//! WhatsApp API Endpoints

use crate::api::{ApiError, AppState};
use crate::auth::models::Claims;
use crate::whatsapp::client::MessageReceipt;
use crate::whatsapp::token_manager::TokenInfo;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

const NOT_CONFIGURED: &str = "WhatsApp integration is not configured";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub message: String,
}

/// POST /whatsapp/messages (BusinessOwner)
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<MessageReceipt>, ApiError> {
    let client = state
        .whatsapp
        .as_ref()
        .ok_or(ApiError::ServiceUnavailable(NOT_CONFIGURED))?;
    let Json(payload) = payload?;

    let receipt = client.send_text_message(&payload.to, &payload.message).await?;
    info!(user_id = %claims.user_id, message_id = %receipt.message_id, "WhatsApp message sent via HTTP");

    Ok(Json(receipt))
}

/// GET /admin/whatsapp/token (Admin)
pub async fn token_info(State(state): State<AppState>) -> Result<Json<TokenInfo>, ApiError> {
    let client = state
        .whatsapp
        .as_ref()
        .ok_or(ApiError::ServiceUnavailable(NOT_CONFIGURED))?;
    Ok(Json(client.tokens().token_info()))
}
