//! Server configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP/WebSocket server binds to
    pub bind_addr: SocketAddr,
    /// JSON question file to load instead of the bundled questions
    pub questions_file: Option<PathBuf>,
    /// Where state snapshots are written and restored from (None = no persistence)
    pub snapshot_file: Option<PathBuf>,
    pub snapshot_interval: Duration,
    /// Default number of leaderboard entries
    pub leaderboard_limit: usize,
    /// Number of past sessions returned for a player's history
    pub history_limit: usize,
    /// Length of the client-side answer timer, advertised to clients
    pub answer_seconds: u32,
    /// Fixed seed for reproducible question draws and polls
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            questions_file: None,
            snapshot_file: None,
            snapshot_interval: Duration::from_secs(30),
            leaderboard_limit: 10,
            history_limit: 5,
            answer_seconds: 30,
            rng_seed: None,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an env var, falling back to `default` with a warning when it is malformed
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}

impl AppConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let leaderboard_limit = match env_parse("LEADERBOARD_LIMIT", defaults.leaderboard_limit) {
            0 => {
                tracing::warn!("LEADERBOARD_LIMIT must be positive, using default");
                defaults.leaderboard_limit
            }
            n => n,
        };

        let snapshot_interval_secs = match env_parse("SNAPSHOT_INTERVAL_SECS", 30u64) {
            0 => {
                tracing::warn!("SNAPSHOT_INTERVAL_SECS must be positive, using default");
                30
            }
            n => n,
        };

        let rng_seed = env_string("RNG_SEED").and_then(|raw| match raw.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                tracing::warn!("Ignoring invalid RNG_SEED={:?}", raw);
                None
            }
        });

        Self {
            bind_addr: env_parse("BIND_ADDR", defaults.bind_addr),
            questions_file: env_string("QUESTIONS_FILE").map(PathBuf::from),
            snapshot_file: env_string("SNAPSHOT_FILE").map(PathBuf::from),
            snapshot_interval: Duration::from_secs(snapshot_interval_secs),
            leaderboard_limit,
            history_limit: env_parse("HISTORY_LIMIT", defaults.history_limit),
            answer_seconds: env_parse("ANSWER_SECONDS", defaults.answer_seconds),
            rng_seed,
        }
    }
}
