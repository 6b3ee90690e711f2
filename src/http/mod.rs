// Presentation layer: axum router over the address service.

pub mod address;
pub mod error;

use crate::core::AddressService;
use address::AppState;
use axum::{
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(service: Arc<AddressService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/addresses",
            get(address::list_addresses).post(address::create_address),
        )
        .route("/api/addresses/street", get(address::search_by_street))
        .route("/api/addresses/city", get(address::search_by_city))
        .route("/api/addresses/cep/:code", get(address::resolve_address))
        .route(
            "/api/addresses/:code",
            put(address::update_address).delete(address::delete_address),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(service))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
