pub mod export;
pub mod machine;
mod player;
pub mod poll;
pub mod prize;
pub mod questions;
mod session;
pub mod store;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::config::AppConfig;
use crate::types::*;
use questions::QuestionBank;
use store::{InMemorySessionStore, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<RwLock<QuestionBank>>,
    pub sessions: Arc<dyn SessionStore>,
    pub players: Arc<RwLock<HashMap<PlayerId, Player>>>,
    pub config: AppConfig,
    rng: Arc<Mutex<StdRng>>,
    /// One mutex per player; every session read-modify-write holds it
    player_locks: Arc<Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(questions: QuestionBank) -> Self {
        Self::with_config(questions, AppConfig::default())
    }

    pub fn with_config(questions: QuestionBank, config: AppConfig) -> Self {
        Self::with_store(questions, config, Arc::new(InMemorySessionStore::new()))
    }

    pub fn with_store(
        questions: QuestionBank,
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => {
                tracing::info!("Using seeded random source ({})", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };

        Self {
            questions: Arc::new(RwLock::new(questions)),
            sessions,
            players: Arc::new(RwLock::new(HashMap::new())),
            config,
            rng: Arc::new(Mutex::new(rng)),
            player_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serialize all session work for one player
    async fn lock_player(&self, player_id: &PlayerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.player_locks.lock().await;
            locks.entry(player_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
