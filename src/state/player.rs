use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::Rng;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Generate a random short code
fn generate_short_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Generate a friendly name like "brave-otter"
fn generate_display_name() -> String {
    petname::petname(2, "-").unwrap_or_else(|| format!("player-{}", generate_short_code()))
}

fn normalize_display_name(display_name: Option<String>) -> GameResult<String> {
    let name = display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    match name {
        Some(name) if name.chars().count() > MAX_DISPLAY_NAME_CHARS => {
            Err(GameError::InvalidDisplayName(format!(
                "must be at most {} characters",
                MAX_DISPLAY_NAME_CHARS
            )))
        }
        Some(name) => Ok(name),
        None => Ok(generate_display_name()),
    }
}

impl AppState {
    /// Create a new player identity with a short access token
    pub async fn create_player(&self, display_name: Option<String>) -> GameResult<Player> {
        let display_name = normalize_display_name(display_name)?;

        let mut players = self.players.write().await;
        // Generate a unique short code (check for collisions)
        let token = loop {
            let code = generate_short_code();
            if !players.values().any(|p| p.token == code) {
                break code;
            }
        };

        let player = Player {
            id: ulid::Ulid::new().to_string(),
            token,
            display_name,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        players.insert(player.id.clone(), player.clone());

        tracing::info!("Created player {} ({})", player.id, player.display_name);
        Ok(player)
    }

    /// Get player by token
    pub async fn get_player_by_token(&self, token: &str) -> Option<Player> {
        self.players
            .read()
            .await
            .values()
            .find(|p| p.token == token)
            .cloned()
    }

    pub async fn get_player(&self, player_id: &PlayerId) -> Option<Player> {
        self.players.read().await.get(player_id).cloned()
    }
}
