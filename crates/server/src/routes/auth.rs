use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use stadium_models::{Credentials, Role, User, UserInput, schema};
use tracing::{info, warn};

use crate::auth::{AuthUser, verify_password};
use crate::error::ApiError;
use crate::extract::Payload;
use crate::notify::{Notification, Resource};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Serialize)]
struct Session {
    token: String,
    user: User,
}

/// Self-service sign-up. Always creates a plain `user`.
async fn register(
    State(state): State<AppState>,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let input: UserInput = schema::parse(&schema::REGISTER, &body)?;
    let hash = state.auth.hash_password(input.password).await?;
    let user = stadium_db::insert_user(&state.pool, &input.username, &input.email, &hash, Role::User)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, "username already taken"))?;

    info!(user_id = user.id, "User registered");
    state.notify(Notification::created(Resource::Users, user.id, &user));
    let token = state.auth.issue(&user)?;
    Ok((StatusCode::CREATED, Json(Session { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Payload(body): Payload,
) -> Result<Json<Session>, ApiError> {
    let credentials: Credentials = schema::parse(&schema::LOGIN, &body)?;
    let invalid = || ApiError::Unauthorized("invalid username or password".to_string());

    let Some(stored) = stadium_db::find_credentials(&state.pool, &credentials.username).await? else {
        warn!(username = %credentials.username, "Login for unknown user");
        return Err(invalid());
    };
    if !verify_password(credentials.password, stored.password_hash).await? {
        warn!(username = %credentials.username, "Login with wrong password");
        return Err(invalid());
    }

    let token = state.auth.issue(&stored.user)?;
    info!(user_id = stored.user.id, "User logged in");
    Ok(Json(Session { token, user: stored.user }))
}

async fn me(State(state): State<AppState>, AuthUser(claims): AuthUser) -> Result<Json<User>, ApiError> {
    stadium_db::get_user(&state.pool, claims.sub)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user", claims.sub))
}
