use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;
use stadium_models::{Page, PageRequest, User, UserInput, UserUpdate, schema};
use tracing::info;

use super::{deleted, merge_into};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::notify::{Notification, Resource};
use crate::state::AppState;

const DUPLICATE_USERNAME: &str = "username already taken";

/// User administration. Every route requires an admin token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Params(params): Params<PageRequest>,
) -> Result<Json<Page<User>>, ApiError> {
    let window = params.window()?;
    Ok(Json(stadium_db::list_users(&state.pool, window).await?))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Id(id): Id,
) -> Result<Json<User>, ApiError> {
    stadium_db::get_user(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user", id))
}

async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let input: UserInput = schema::parse(&schema::NEW_USER, &body)?;
    let hash = state.auth.hash_password(input.password).await?;
    let user = stadium_db::insert_user(&state.pool, &input.username, &input.email, &hash, input.role)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, DUPLICATE_USERNAME))?;
    info!(user_id = user.id, role = %user.role, admin = %admin.username, "User created");
    state.notify(Notification::created(Resource::Users, user.id, &user));
    Ok((StatusCode::CREATED, Json(user)))
}

/// Merges into the stored user. A `password` field, when present, is
/// rehashed; otherwise the stored hash is kept.
async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
    Payload(patch): Payload,
) -> Result<Json<User>, ApiError> {
    let existing = stadium_db::get_user(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("user", id))?;

    let update: UserUpdate = schema::parse(&schema::USER_UPDATE, &merge_into(&existing, patch)?)?;
    let hash = match update.password {
        Some(password) => Some(state.auth.hash_password(password).await?),
        None => None,
    };

    let user = stadium_db::update_user(
        &state.pool,
        id,
        &update.username,
        &update.email,
        update.role,
        hash.as_deref(),
    )
    .await
    .map_err(|e| ApiError::conflict_on_duplicate(e, DUPLICATE_USERNAME))?
    .ok_or_else(|| ApiError::not_found("user", id))?;

    info!(user_id = id, admin = %admin.username, "User updated");
    state.notify(Notification::updated(Resource::Users, id, &user));
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    if admin.sub == id {
        return Err(ApiError::Conflict("cannot delete your own account".to_string()));
    }
    if !stadium_db::delete_user(&state.pool, id).await? {
        return Err(ApiError::not_found("user", id));
    }
    info!(user_id = id, admin = %admin.username, "User deleted");
    state.notify(Notification::deleted(Resource::Users, id));
    Ok(deleted())
}
