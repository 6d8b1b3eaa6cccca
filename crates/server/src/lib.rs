//! HTTP surface of the stadium backend: the `/api` routers, CORS policy,
//! static frontend hosting and the realtime notification socket.

use std::time::Duration;

use axum::{Router, ServiceExt, extract::Request, middleware, routing::get};
use sqlx::SqlitePool;
use stadium_config::Config;
use tower_http::normalize_path::NormalizePath;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};

pub mod auth;
pub mod cors;
pub mod error;
pub mod extract;
pub mod notify;
pub mod realtime;
pub mod routes;
pub mod state;

use auth::AuthKeys;
use cors::AllowList;
use notify::Hub;
use state::AppState;

/// Delay between migration attempts while running degraded.
const MIGRATION_RETRY: Duration = Duration::from_secs(5);

/// The routed application. Trailing slashes are trimmed before routing, so
/// `/api/games/` and `/api/games` reach the same handler.
pub type App = NormalizePath<Router>;

/// Assemble the full application: API, liveness, optional websocket,
/// uploads and either the SPA or a JSON 404 for everything else.
pub fn router(state: AppState, config: &Config) -> App {
    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/health", get(routes::liveness));

    if state.hub.is_some() {
        app = app.route("/ws", get(realtime::websocket));
    }

    if let Some(uploads) = &config.uploads_dir {
        app = app.nest_service("/uploads", ServeDir::new(uploads));
    }

    app = match &config.static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            app.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => app.route("/", get(routes::liveness)).fallback(routes::not_found),
    };

    let allow = AllowList::new(config.origins());
    let app = app
        .layer(cors::layer(allow.clone()))
        .layer(middleware::from_fn_with_state(allow, cors::reject_unlisted))
        .with_state(state);
    NormalizePath::trim_trailing_slash(app)
}

/// Connect and migrate. With `degraded_start` a failed connection falls
/// back to a lazy pool so the process still boots and answers liveness;
/// migrations are retried in the background until the database is reachable.
pub async fn open_database(config: &Config) -> anyhow::Result<SqlitePool> {
    open_with_retry(config, MIGRATION_RETRY).await
}

async fn open_with_retry(config: &Config, retry: Duration) -> anyhow::Result<SqlitePool> {
    let connected = async {
        let pool = stadium_db::connect(&config.db_url).await?;
        stadium_db::migrate(&pool).await?;
        anyhow::Ok(pool)
    }
    .await;

    match connected {
        Ok(pool) => Ok(pool),
        Err(e) if config.degraded_start => {
            warn!(error = %e, "Database unavailable, starting in degraded mode");
            let pool = stadium_db::connect_lazy(&config.db_url)?;
            tokio::spawn(migrate_when_reachable(pool.clone(), retry));
            Ok(pool)
        }
        Err(e) => Err(e),
    }
}

async fn migrate_when_reachable(pool: SqlitePool, retry: Duration) {
    loop {
        tokio::time::sleep(retry).await;
        if pool.is_closed() {
            return;
        }
        match stadium_db::migrate(&pool).await {
            Ok(()) => {
                info!("Database reachable again, leaving degraded mode");
                return;
            }
            Err(e) => debug!(error = %e, "Database still unavailable"),
        }
    }
}

pub async fn serve(config: &Config, pool: SqlitePool) -> anyhow::Result<()> {
    if config.uses_default_secret() {
        warn!("Using the built-in JWT secret; set STADIUM_JWT_SECRET in production");
    }

    let hub = config.realtime.then(|| Hub::new(Hub::DEFAULT_CAPACITY));
    let state = AppState::new(pool, AuthKeys::from_config(config), hub);
    let app = router(state, config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        origins = ?config.origins(),
        realtime = config.realtime,
        static_dir = ?config.static_dir,
        "Listening on http://{addr}"
    );

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed
/// just never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use futures::StreamExt;
    use serde_json::{Value, json};
    use stadium_models::Role;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn listed_origins_get_credentialed_cors_headers() {
        let (app, _) = test_app().await;
        let req = Request::builder()
            .uri("/api/games")
            .header(header::ORIGIN, TEST_ORIGIN)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], TEST_ORIGIN);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn unlisted_origins_are_forbidden() {
        let (app, _) = test_app().await;
        for method in [Method::GET, Method::OPTIONS] {
            let req = Request::builder()
                .method(method)
                .uri("/api/games")
                .header(header::ORIGIN, "http://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, json!({ "error": "Not allowed by CORS" }));
        }
    }

    #[tokio::test]
    async fn static_mode_serves_the_spa_and_keeps_api_404s() {
        let dir = std::env::temp_dir().join(format!("stadium-spa-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>stadium</html>").unwrap();

        let mut config = test_config();
        config.static_dir = Some(dir.clone());
        let app = router(test_state().await, &config);

        for path in ["/", "/games/12"] {
            let resp = app.clone().oneshot(Request::get(path).body(Body::empty()).unwrap()).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{path}");
            let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
            assert_eq!(&bytes[..], b"<html>stadium</html>");
        }

        let (status, body) = send(&app, Method::GET, "/api/unknown", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn unknown_paths_are_json_404s_without_static_dir() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no route for /nowhere");
    }

    #[tokio::test]
    async fn uploads_are_served_from_the_uploads_dir() {
        let dir = std::env::temp_dir().join(format!("stadium-uploads-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("derby.png"), b"png-bytes").unwrap();

        let mut config = test_config();
        config.uploads_dir = Some(dir.clone());
        let app = router(test_state().await, &config);

        let resp = app.clone().oneshot(Request::get("/uploads/derby.png").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"png-bytes");

        let resp = app.oneshot(Request::get("/uploads/missing.png").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn degraded_start_boots_and_migrates_once_reachable() {
        let dir = std::env::temp_dir().join(format!("stadium-degraded-{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        let mut config = test_config();
        config.db_url = format!("sqlite:{}", dir.join("stadium.db").display());

        assert!(open_database(&config).await.is_err());

        config.degraded_start = true;
        let pool = open_with_retry(&config, Duration::from_millis(50)).await.unwrap();
        let app = router(AppState::new(pool, AuthKeys::new("test-secret", 1, 4), None), &config);

        let (status, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::GET, "/api/games", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");

        std::fs::create_dir_all(&dir).unwrap();
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let (status, _) = send(&app, Method::GET, "/api/games", None, None).await;
                if status == StatusCode::OK {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn websocket_is_absent_when_realtime_is_off() {
        let pool = stadium_db::memory().await.unwrap();
        let state = AppState::new(pool, AuthKeys::new("test-secret", 1, 4), None);
        let app = router(state, &test_config());
        let (status, _) = send(&app, Method::GET, "/ws", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn websocket_clients_receive_mutations() {
        let state = test_state().await;
        let token = token_for(&state, "admin", Role::Admin).await;
        let app = router(state.clone(), &test_config());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = app.clone();
        tokio::spawn(async move {
            axum::serve(listener, axum::ServiceExt::<axum::extract::Request>::into_make_service(server)).await
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let hub = state.hub.clone().unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.client_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let game = json!({ "name": "Derby", "date": "2024-05-01" });
        let (status, created) = send(&app, Method::POST, "/api/games", Some(&token), Some(game)).await;
        assert_eq!(status, StatusCode::CREATED);

        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let event: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
        assert_eq!(event["resource"], "games");
        assert_eq!(event["action"], "created");
        assert_eq!(event["id"], created["id"]);
        assert_eq!(event["data"]["name"], "Derby");
    }
}
