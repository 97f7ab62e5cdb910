use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Provision a player identity (no credentials, just a token)
    CreatePlayer {
        display_name: Option<String>,
    },
    StartGame {
        player_token: String,
    },
    GetSession {
        player_token: String,
    },
    /// `choice` is "A".."D" or "TIMEOUT"
    SubmitAnswer {
        player_token: String,
        choice: String,
    },
    /// `lifeline` is "fifty_fifty", "skip" or "audience_poll"
    UseLifeline {
        player_token: String,
        lifeline: String,
    },
    QuitGame {
        player_token: String,
    },
    GetResult {
        player_token: String,
    },
    GetHistory {
        player_token: String,
    },
    GetLeaderboard {
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
        prize_ladder: Vec<PrizeLevel>,
        answer_seconds: u32,
    },
    PlayerCreated {
        player_id: PlayerId,
        token: String,
        display_name: String,
    },
    Session {
        session: SessionView,
    },
    /// The player has no active session
    NoSession,
    LifelineUsed {
        session: SessionView,
        /// Only for the audience poll; display-only, not stored
        #[serde(skip_serializing_if = "Option::is_none")]
        poll: Option<PollDistribution>,
    },
    Result {
        session: Option<SessionView>,
    },
    History {
        sessions: Vec<SessionView>,
        best_score: u64,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(e: crate::error::GameError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}
