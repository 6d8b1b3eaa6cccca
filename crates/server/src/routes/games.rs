use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;
use stadium_models::{Game, GameInput, Page, PageRequest, Ticket, lift_team};
use tracing::info;

use super::{deleted, merge_into};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::notify::{Notification, Resource};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games).post(create_game))
        .route(
            "/{id}",
            get(get_game).put(update_game).patch(update_game).delete(delete_game),
        )
        .route("/{id}/tickets", get(game_tickets))
}

async fn list_games(
    State(state): State<AppState>,
    Params(params): Params<PageRequest>,
) -> Result<Json<Page<Game>>, ApiError> {
    let window = params.window()?;
    let page = stadium_db::list_games(&state.pool, window).await?;
    Ok(Json(page))
}

async fn get_game(State(state): State<AppState>, Id(id): Id) -> Result<Json<Game>, ApiError> {
    stadium_db::get_game(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("game", id))
}

async fn create_game(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Game>), ApiError> {
    let input = GameInput::from_payload(body)?;
    let game = stadium_db::insert_game(&state.pool, &input).await?;
    info!(game_id = game.id, admin = %admin.username, "Game created");
    state.notify(Notification::created(Resource::Games, game.id, &game));
    Ok((StatusCode::CREATED, Json(game)))
}

/// PUT and PATCH both merge the submitted fields into the stored game.
async fn update_game(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
    Payload(mut patch): Payload,
) -> Result<Json<Game>, ApiError> {
    let existing = stadium_db::get_game(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("game", id))?;

    lift_team(&mut patch);
    let input = GameInput::from_payload(merge_into(&existing, patch)?)?;

    let game = stadium_db::update_game(&state.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("game", id))?;
    info!(game_id = id, admin = %admin.username, "Game updated");
    state.notify(Notification::updated(Resource::Games, id, &game));
    Ok(Json(game))
}

async fn delete_game(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    if !stadium_db::delete_game(&state.pool, id).await? {
        return Err(ApiError::not_found("game", id));
    }
    info!(game_id = id, admin = %admin.username, "Game deleted");
    state.notify(Notification::deleted(Resource::Games, id));
    Ok(deleted())
}

async fn game_tickets(
    State(state): State<AppState>,
    Id(id): Id,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    if stadium_db::get_game(&state.pool, id).await?.is_none() {
        return Err(ApiError::not_found("game", id));
    }
    let tickets = stadium_db::list_tickets_for_game(&state.pool, id).await?;
    Ok(Json(tickets))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;
    use stadium_models::Role;
    use tower::ServiceExt;

    use super::super::test_support::*;
    use crate::notify::{Action, Resource};

    #[tokio::test]
    async fn created_game_lists_with_exactly_its_fields() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let game = json!({
            "name": "Porto vs Benfica",
            "date": "2024-05-01",
            "image": "derby.png",
            "team": { "home": "Porto", "visitor": "Benfica" }
        });
        let (status, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(game)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, listing) = send(&app, Method::GET, "/api/games", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            listing["data"],
            json!([{
                "id": created["id"],
                "name": "Porto vs Benfica",
                "date": "2024-05-01",
                "image": "derby.png",
                "team": { "home": "Porto", "visitor": "Benfica" }
            }])
        );
        assert_eq!(listing["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn empty_visitor_is_preserved() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let form = json!({
            "name": "Game Porto",
            "date": "2020-01-02",
            "image": "url",
            "home": "home",
            "visitor": ""
        });
        let (status, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["team"], json!({ "home": "home", "visitor": "" }));

        let (_, fetched) = send(&app, Method::GET, &format!("/api/games/{}", created["id"]), None, None).await;
        assert_eq!(fetched["team"]["visitor"], "");
    }

    #[tokio::test]
    async fn null_optional_fields_use_defaults() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let game = json!({ "name": "G", "date": "2024-01-01", "image": null });
        let (status, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(game)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["image"], "");

        let uri = format!("/api/games/{}", created["id"]);
        let (status, updated) =
            send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "image": null, "home": "Porto" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["team"]["home"], "Porto");
    }

    #[tokio::test]
    async fn url_encoded_forms_are_accepted() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/games")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Game+Porto&date=2020-01-02&image=url&home=home&visitor="))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn patch_merges_partial_team() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;
        let game = json!({ "name": "Derby", "date": "2024-05-01", "team": { "home": "Porto", "visitor": "Benfica" } });
        let (_, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(game)).await;
        let uri = format!("/api/games/{}", created["id"]);

        let (status, updated) =
            send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "visitor": "Sporting" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["team"], json!({ "home": "Porto", "visitor": "Sporting" }));
        assert_eq!(updated["name"], "Derby");

        let (status, updated) =
            send(&app, Method::PUT, &uri, Some(&token), Some(json!({ "name": "Clássico" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Clássico");
        assert_eq!(updated["team"]["visitor"], "Sporting");
    }

    #[tokio::test]
    async fn invalid_games_are_unprocessable() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let (status, body) =
            send(&app, Method::POST, "/api/games", Some(&token), Some(json!({ "date": "2024-01-01" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "name: is required");
    }

    #[tokio::test]
    async fn writes_require_an_admin_token() {
        let (app, state) = test_app().await;
        let game = json!({ "name": "Derby", "date": "2024-05-01" });

        let (status, _) = send(&app, Method::POST, "/api/games", None, Some(game.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let fan = token_for(&state, "fan", Role::User).await;
        let (status, body) = send(&app, Method::POST, "/api/games", Some(&fan), Some(game)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "admin role required");
    }

    #[tokio::test]
    async fn missing_games_are_404() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;

        let (status, _) = send(&app, Method::GET, "/api/games/99", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, "/api/games/99", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, "/api/games/99/tickets", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(&app, Method::GET, "/api/games/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn mutations_notify_subscribers() {
        let (app, state) = test_app().await;
        let token = token_for(&state, "admin", Role::Admin).await;
        let mut rx = state.hub.as_ref().unwrap().subscribe();

        let game = json!({ "name": "Derby", "date": "2024-05-01" });
        let (_, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(game)).await;
        let uri = format!("/api/games/{}", created["id"]);
        send(&app, Method::DELETE, &uri, Some(&token), None).await;

        let first = rx.recv().await.unwrap();
        assert_eq!((first.resource, first.action), (Resource::Games, Action::Created));
        assert_eq!(first.data.unwrap()["name"], "Derby");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.action, Action::Deleted);
        assert_eq!(json!(second.id), created["id"]);
    }

    #[tokio::test]
    async fn paging_is_validated() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/games?page=0", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "page: must be at least 1");

        let (status, _) = send(&app, Method::GET, "/api/games?limit=many", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
