//! Websocket endpoint streaming notifications to admin clients.
//!
//! Server → client only: every message is a JSON-encoded
//! [`Notification`](crate::notify::Notification). Client messages other
//! than close frames are ignored.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::notify::Hub;
use crate::state::AppState;

pub async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(hub) = state.hub.clone() else {
        return ApiError::NotFound("realtime channel disabled".to_string()).into_response();
    };
    ws.on_upgrade(move |socket| session(socket, hub))
}

async fn session(socket: WebSocket, hub: Hub) {
    let (mut sender, mut receiver) = socket.split();
    let mut notifications = hub.subscribe();
    info!(clients = hub.client_count(), "realtime client connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    let text = match serde_json::to_string(&notification) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "failed to encode notification");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "realtime client lagged, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("realtime client disconnected");
}
