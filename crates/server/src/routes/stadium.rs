use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;
use stadium_models::{Page, PageRequest, Stadium, StadiumInput, schema};
use tracing::info;

use super::{deleted, merge_into};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stadiums).post(create_stadium))
        .route(
            "/{id}",
            get(get_stadium).put(update_stadium).patch(update_stadium).delete(delete_stadium),
        )
}

async fn list_stadiums(
    State(state): State<AppState>,
    Params(params): Params<PageRequest>,
) -> Result<Json<Page<Stadium>>, ApiError> {
    let window = params.window()?;
    Ok(Json(stadium_db::list_stadiums(&state.pool, window).await?))
}

async fn get_stadium(State(state): State<AppState>, Id(id): Id) -> Result<Json<Stadium>, ApiError> {
    stadium_db::get_stadium(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("stadium", id))
}

async fn create_stadium(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Stadium>), ApiError> {
    let input: StadiumInput = schema::parse(&schema::STADIUM, &body)?;
    let stadium = stadium_db::insert_stadium(&state.pool, &input).await?;
    info!(stadium_id = stadium.id, admin = %admin.username, "Stadium created");
    Ok((StatusCode::CREATED, Json(stadium)))
}

async fn update_stadium(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
    Payload(patch): Payload,
) -> Result<Json<Stadium>, ApiError> {
    let existing = stadium_db::get_stadium(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("stadium", id))?;
    let input: StadiumInput = schema::parse(&schema::STADIUM, &merge_into(&existing, patch)?)?;
    let stadium = stadium_db::update_stadium(&state.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("stadium", id))?;
    info!(stadium_id = id, admin = %admin.username, "Stadium updated");
    Ok(Json(stadium))
}

async fn delete_stadium(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    if !stadium_db::delete_stadium(&state.pool, id).await? {
        return Err(ApiError::not_found("stadium", id));
    }
    info!(stadium_id = id, admin = %admin.username, "Stadium deleted");
    Ok(deleted())
}
