use crate::auth::{
    api as auth_api, auth_middleware, require_admin, require_business_owner, AuthService,
    UserService,
};
use crate::business::{api as business_api, BusinessService};
use crate::middleware::request_logging;
use crate::whatsapp::{api as whatsapp_api, WhatsAppClient};
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub businesses: Arc<BusinessService>,
    pub whatsapp: Option<Arc<WhatsAppClient>>,
}

/// Assemble every route. Layers run outside-in: authentication is added
/// after the role gates so it executes first and the gates can read claims.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(auth_api::login))
        .route("/auth/refresh", post(auth_api::refresh))
        .route("/users", post(auth_api::register));

    let owner_routes = Router::new()
        .route("/businesses", post(business_api::create_business))
        .route("/businesses/mine", get(business_api::my_businesses))
        .route("/whatsapp/messages", post(whatsapp_api::send_message))
        .route_layer(middleware::from_fn(require_business_owner));

    let admin_routes = Router::new()
        .route("/admin/users", get(auth_api::list_users))
        .route("/admin/businesses", get(business_api::list_businesses))
        .route("/admin/whatsapp/token", get(whatsapp_api::token_info))
        .route_layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth_api::me))
        .route("/users/by-email", get(auth_api::get_user_by_email))
        .route("/users/:id", get(auth_api::get_user))
        .route(
            "/businesses/:id",
            get(business_api::get_business)
                .put(business_api::update_business)
                .delete(business_api::delete_business),
        )
        .merge(owner_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        service: "easy-queue".to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}
