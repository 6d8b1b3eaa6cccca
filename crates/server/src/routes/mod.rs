use axum::{Json, Router, extract::OriginalUri, routing::get};
use serde::Serialize;
use serde_json::{Value, json};
use stadium_models::schema;

use crate::error::ApiError;
use crate::state::AppState;

mod auth;
mod games;
mod stadium;
mod tickets;
mod users;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `/api` namespace: every domain router under its prefix.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(gateway_status))
        .nest("/auth", auth::router())
        .nest("/stadium", stadium::router())
        .nest("/users", users::router())
        .nest("/tickets", tickets::router())
        .nest("/games", games::router())
        .fallback(api_not_found)
}

/// Process liveness. Never touches the database.
pub async fn liveness() -> Json<Value> {
    Json(json!({
        "message": "Stadium API is up",
        "status": "OK"
    }))
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

async fn gateway_status() -> Json<Value> {
    Json(json!({
        "message": "API gateway operational",
        "version": VERSION
    }))
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("no API route for {}", uri.path()))
}

/// The stored record with a partial update deep-merged over it.
fn merge_into<T: Serialize>(existing: &T, patch: Value) -> Result<Value, ApiError> {
    let mut merged = serde_json::to_value(existing).map_err(|e| ApiError::Internal(e.into()))?;
    schema::merge(&mut merged, patch);
    Ok(merged)
}

fn deleted() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
