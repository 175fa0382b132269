//! WebSocket push of registry events

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::AppState;
use crate::events::RegistryEvent;

pub async fn events_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    // Subscribe before the upgrade so nothing committed after the handshake is missed
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<RegistryEvent>) {
    let (mut sender, mut receiver) = socket.split();
    info!("Event subscriber connected");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let payload = match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("Failed to encode event: {}", e);
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged, skipped {} events", skipped);
                        serde_json::json!({ "event": "lagged", "skipped": skipped }).to_string()
                    }
                    Err(RecvError::Closed) => break,
                };

                if sender.send(Message::Text(payload.into())).await.is_err() {
                    debug!("Event subscriber went away");
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    }

    info!("Event subscriber disconnected");
}
