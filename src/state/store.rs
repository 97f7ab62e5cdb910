//! Session persistence
//!
//! The state machine is the only writer. Writes are version-checked so a
//! session modified between read and write is rejected instead of clobbered.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{GameError, GameResult};
use crate::types::{GameSession, PlayerId, SessionId};

/// Closes a session superseded by a new one
pub type RetireFn = fn(&mut GameSession);

/// Storage for game sessions, keyed by session id with an active index per player
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retire the player's active session (if any) with `retire` and make
    /// `session` the active one, as one atomic step. Returns the retired session.
    async fn replace_active(
        &self,
        session: GameSession,
        retire: RetireFn,
    ) -> GameResult<Option<GameSession>>;

    async fn active_for(&self, player_id: &PlayerId) -> Option<GameSession>;

    /// Persist a modified session. Fails if the stored copy has moved on
    /// (different version) or is already terminal. Returns the stored session
    /// with its bumped version.
    async fn update(&self, session: GameSession) -> GameResult<GameSession>;

    /// All of a player's sessions, newest first
    async fn history_for(&self, player_id: &PlayerId) -> Vec<GameSession>;

    /// The player's most recently ended session
    async fn latest_finished(&self, player_id: &PlayerId) -> Option<GameSession>;

    /// Every terminal session, in the order they ended
    async fn finished(&self) -> Vec<GameSession>;

    async fn all(&self) -> Vec<GameSession>;

    /// Replace the store contents (snapshot import)
    async fn restore(&self, sessions: Vec<GameSession>);
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, GameSession>,
    /// At most one entry per player
    active: HashMap<PlayerId, SessionId>,
    /// Session ids in the order they reached a terminal state
    finished: Vec<SessionId>,
    /// Session ids in creation order
    created: Vec<SessionId>,
}

impl Inner {
    fn mark_finished(&mut self, session: &GameSession) {
        self.active.remove(&session.owner);
        self.finished.push(session.id.clone());
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Inner>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn replace_active(
        &self,
        session: GameSession,
        retire: RetireFn,
    ) -> GameResult<Option<GameSession>> {
        let mut inner = self.inner.write().await;

        let retired = match inner.active.get(&session.owner).cloned() {
            Some(old_id) => {
                let old = inner
                    .sessions
                    .get_mut(&old_id)
                    .ok_or_else(|| GameError::ConcurrencyConflict(old_id.clone()))?;
                retire(old);
                old.version += 1;
                let old = old.clone();
                inner.mark_finished(&old);
                Some(old)
            }
            None => None,
        };

        inner
            .active
            .insert(session.owner.clone(), session.id.clone());
        inner.created.push(session.id.clone());
        inner.sessions.insert(session.id.clone(), session);

        Ok(retired)
    }

    async fn active_for(&self, player_id: &PlayerId) -> Option<GameSession> {
        let inner = self.inner.read().await;
        let id = inner.active.get(player_id)?;
        inner.sessions.get(id).cloned()
    }

    async fn update(&self, mut session: GameSession) -> GameResult<GameSession> {
        let mut inner = self.inner.write().await;

        let stored = inner
            .sessions
            .get(&session.id)
            .ok_or_else(|| GameError::ConcurrencyConflict(session.id.clone()))?;
        if stored.version != session.version || stored.status.is_terminal() {
            return Err(GameError::ConcurrencyConflict(session.id.clone()));
        }

        session.version += 1;
        if session.status.is_terminal() {
            inner.mark_finished(&session);
        }
        inner.sessions.insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn history_for(&self, player_id: &PlayerId) -> Vec<GameSession> {
        let inner = self.inner.read().await;
        inner
            .created
            .iter()
            .rev()
            .filter_map(|id| inner.sessions.get(id))
            .filter(|s| &s.owner == player_id)
            .cloned()
            .collect()
    }

    async fn latest_finished(&self, player_id: &PlayerId) -> Option<GameSession> {
        let inner = self.inner.read().await;
        inner
            .finished
            .iter()
            .rev()
            .filter_map(|id| inner.sessions.get(id))
            .find(|s| &s.owner == player_id)
            .cloned()
    }

    async fn finished(&self) -> Vec<GameSession> {
        let inner = self.inner.read().await;
        inner
            .finished
            .iter()
            .filter_map(|id| inner.sessions.get(id))
            .cloned()
            .collect()
    }

    async fn all(&self) -> Vec<GameSession> {
        let inner = self.inner.read().await;
        inner
            .created
            .iter()
            .filter_map(|id| inner.sessions.get(id))
            .cloned()
            .collect()
    }

    async fn restore(&self, mut sessions: Vec<GameSession>) {
        let mut inner = self.inner.write().await;

        // Restored sessions must outrank any copy a caller loaded before the
        // restore, or its version-checked write would still go through
        for session in &mut sessions {
            let stored = inner.sessions.get(&session.id).map_or(0, |s| s.version);
            session.version = session.version.max(stored) + 1;
        }
        *inner = Inner::default();

        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        for session in &sessions {
            inner.created.push(session.id.clone());
            if session.is_active() {
                inner
                    .active
                    .insert(session.owner.clone(), session.id.clone());
            }
        }

        let mut ended: Vec<&GameSession> = sessions.iter().filter(|s| !s.is_active()).collect();
        ended.sort_by(|a, b| a.ended_at.cmp(&b.ended_at));
        inner.finished = ended.iter().map(|s| s.id.clone()).collect();

        inner.sessions = sessions.into_iter().map(|s| (s.id.clone(), s)).collect();
        tracing::info!("Restored {} sessions", inner.sessions.len());
    }
}
