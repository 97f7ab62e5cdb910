//! WebSocket message dispatch
//!
//! Resolves the player token, runs the game operation and turns the outcome
//! into a reply. Transport-free so it can be driven directly from tests.

use std::future::Future;
use std::sync::Arc;

use crate::error::{ErrorKind, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Player;

/// Resolve a player token or return an error reply
macro_rules! require_player {
    ($state:expr, $token:expr) => {
        match $state.get_player_by_token(&$token).await {
            Some(player) => player,
            None => {
                return Some(ServerMessage::error(
                    "INVALID_PLAYER_TOKEN",
                    "Unknown player token",
                ));
            }
        }
    };
}

/// Run `op`, retrying once if the session changed underneath it
pub async fn retry_on_conflict<T, F, Fut>(op: F) -> GameResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = GameResult<T>>,
{
    match op().await {
        Err(e) if e.kind() == ErrorKind::ConcurrencyConflict => {
            tracing::warn!("{}, retrying once", e);
            op().await
        }
        result => result,
    }
}

fn reply<T>(result: GameResult<T>, ok: impl FnOnce(T) -> ServerMessage) -> Option<ServerMessage> {
    match result {
        Ok(value) => Some(ok(value)),
        Err(e) => {
            if e.kind() == ErrorKind::DataIntegrity {
                tracing::error!("Data integrity fault: {}", e);
            }
            Some(e.into())
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreatePlayer { display_name } => {
            reply(state.create_player(display_name).await, |player: Player| {
                ServerMessage::PlayerCreated {
                    player_id: player.id,
                    token: player.token,
                    display_name: player.display_name,
                }
            })
        }

        ClientMessage::StartGame { player_token } => {
            let player = require_player!(state, player_token);
            let result = retry_on_conflict(|| state.start_game(&player.id)).await;
            reply(result, |session| ServerMessage::Session { session })
        }

        ClientMessage::GetSession { player_token } => {
            let player = require_player!(state, player_token);
            Some(match state.get_active_session(&player.id).await {
                Some(session) => ServerMessage::Session { session },
                None => ServerMessage::NoSession,
            })
        }

        ClientMessage::SubmitAnswer {
            player_token,
            choice,
        } => {
            let player = require_player!(state, player_token);
            let result = retry_on_conflict(|| state.submit_answer(&player.id, &choice)).await;
            reply(result, |session| ServerMessage::Session { session })
        }

        ClientMessage::UseLifeline {
            player_token,
            lifeline,
        } => {
            let player = require_player!(state, player_token);
            let result = retry_on_conflict(|| state.use_lifeline(&player.id, &lifeline)).await;
            reply(result, |(session, poll)| ServerMessage::LifelineUsed {
                session,
                poll,
            })
        }

        ClientMessage::QuitGame { player_token } => {
            let player = require_player!(state, player_token);
            let result = retry_on_conflict(|| state.quit_game(&player.id)).await;
            reply(result, |session| ServerMessage::Session { session })
        }

        ClientMessage::GetResult { player_token } => {
            let player = require_player!(state, player_token);
            Some(ServerMessage::Result {
                session: state.get_result(&player.id).await,
            })
        }

        ClientMessage::GetHistory { player_token } => {
            let player = require_player!(state, player_token);
            Some(ServerMessage::History {
                sessions: state.history(&player.id, state.config.history_limit).await,
                best_score: state.best_score(&player.id).await,
            })
        }

        ClientMessage::GetLeaderboard { limit } => {
            let limit = limit.unwrap_or(state.config.leaderboard_limit);
            Some(ServerMessage::Leaderboard {
                entries: state.get_leaderboard(limit).await,
            })
        }
    }
}
