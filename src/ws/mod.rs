pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{prize, AppState};

pub const PROTOCOL_VERSION: &str = "1.0";

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

pub fn welcome_message(state: &AppState) -> ServerMessage {
    ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
        prize_ladder: prize::ladder(),
        answer_seconds: state.config.answer_seconds,
    }
}

/// Handle individual WebSocket connection.
///
/// Strictly request/response: every client message gets at most one reply.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    if let Ok(msg) = serde_json::to_string(&welcome_message(&state)) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    while let Some(ws_msg) = receiver.next().await {
        match ws_msg {
            Ok(Message::Text(text)) => {
                tracing::debug!("Received message: {}", text);

                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => handlers::handle_message(client_msg, &state).await,
                    Err(e) => {
                        tracing::error!("Failed to parse client message: {}", e);
                        Some(ServerMessage::error(
                            "PARSE_ERROR",
                            format!("Invalid message format: {}", e),
                        ))
                    }
                };

                if let Some(response) = response {
                    if let Ok(json) = serde_json::to_string(&response) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed");
                break;
            }
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_message() {
        let state = crate::state::tests::test_state();
        match welcome_message(&state) {
            ServerMessage::Welcome {
                protocol,
                prize_ladder,
                answer_seconds,
                ..
            } => {
                assert_eq!(protocol, PROTOCOL_VERSION);
                assert_eq!(prize_ladder.len(), 15);
                assert_eq!(answer_seconds, 30);
            }
            other => panic!("Expected welcome, got {:?}", other),
        }
    }
}
