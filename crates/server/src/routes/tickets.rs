use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use stadium_models::{
    Page, PageRequest, Ticket, TicketInput, TicketSummary, ValidationError, schema,
};
use tracing::info;

use super::{deleted, merge_into};
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/summary", get(summary))
        .route("/mine", get(my_tickets))
        .route(
            "/{id}",
            get(get_ticket).put(update_ticket).patch(update_ticket).delete(delete_ticket),
        )
        .route("/{id}/purchase", post(purchase))
}

#[derive(Debug, Default, Deserialize)]
struct TicketQuery {
    page: Option<u32>,
    limit: Option<u32>,
    game_id: Option<i64>,
}

async fn list_tickets(
    State(state): State<AppState>,
    Params(query): Params<TicketQuery>,
) -> Result<Json<Page<Ticket>>, ApiError> {
    let window = PageRequest { page: query.page, limit: query.limit }.window()?;
    let page = stadium_db::list_tickets(&state.pool, query.game_id, window).await?;
    Ok(Json(page))
}

async fn get_ticket(State(state): State<AppState>, Id(id): Id) -> Result<Json<Ticket>, ApiError> {
    stadium_db::get_ticket(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("ticket", id))
}

async fn create_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let input: TicketInput = schema::parse(&schema::TICKET, &body)?;
    ensure_game_exists(&state.pool, input.game_id).await?;
    let ticket = stadium_db::insert_ticket(&state.pool, &input).await?;
    info!(ticket_id = ticket.id, game_id = ticket.game_id, admin = %admin.username, "Ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn update_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
    Payload(patch): Payload,
) -> Result<Json<Ticket>, ApiError> {
    let existing = stadium_db::get_ticket(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("ticket", id))?;

    let input: TicketInput = schema::parse(&schema::TICKET, &merge_into(&existing, patch)?)?;
    if input.game_id != existing.game_id {
        ensure_game_exists(&state.pool, input.game_id).await?;
    }

    let ticket = stadium_db::update_ticket(&state.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("ticket", id))?;
    info!(ticket_id = id, status = %ticket.status, admin = %admin.username, "Ticket updated");
    Ok(Json(ticket))
}

async fn delete_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    if !stadium_db::delete_ticket(&state.pool, id).await? {
        return Err(ApiError::not_found("ticket", id));
    }
    info!(ticket_id = id, admin = %admin.username, "Ticket deleted");
    Ok(deleted())
}

async fn summary(State(state): State<AppState>) -> Result<Json<Vec<TicketSummary>>, ApiError> {
    Ok(Json(stadium_db::ticket_summary(&state.pool).await?))
}

async fn my_tickets(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    Ok(Json(stadium_db::list_tickets_for_owner(&state.pool, claims.sub).await?))
}

/// Claim an available ticket for the caller.
async fn purchase(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Id(id): Id,
) -> Result<Json<Ticket>, ApiError> {
    if stadium_db::get_ticket(&state.pool, id).await?.is_none() {
        return Err(ApiError::not_found("ticket", id));
    }
    let ticket = stadium_db::purchase_ticket(&state.pool, id, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("ticket {id} is not available")))?;
    info!(ticket_id = id, user_id = claims.sub, "Ticket purchased");
    Ok(Json(ticket))
}

/// Existence check only; a game deleted right after this check still
/// leaves the ticket pointing at it.
async fn ensure_game_exists(pool: &SqlitePool, game_id: i64) -> Result<(), ApiError> {
    match stadium_db::get_game(pool, game_id).await? {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("game_id", format!("game {game_id} does not exist")).into()),
    }
}
