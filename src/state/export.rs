//! State export/import and snapshot files.
//!
//! A snapshot holds the question bank, all sessions and the player registry
//! so a restarted server picks up where it left off.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::prize::MAX_LEVEL;
use super::AppState;
use crate::error::SnapshotError;
use crate::types::*;

/// Schema version for export format compatibility
/// Version 1: questions, sessions, players
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of the entire game state.
///
/// Excludes runtime-only components:
/// - Random source (reseeded at startup)
/// - Per-player locks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateExport {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub sessions: Vec<GameSession>,
    #[serde(default)]
    pub players: HashMap<PlayerId, Player>,
}

impl GameStateExport {
    /// Create a new export with current timestamp
    pub fn new(
        questions: Vec<Question>,
        sessions: Vec<GameSession>,
        players: HashMap<PlayerId, Player>,
    ) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            questions,
            sessions,
            players,
        }
    }

    /// Validate the export before import
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(SnapshotError::Invalid(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            )));
        }

        for question in &self.questions {
            if question.level == 0 || question.level > MAX_LEVEL {
                return Err(SnapshotError::Invalid(format!(
                    "Question '{}' has level {} outside 1..={}",
                    question.id, question.level, MAX_LEVEL
                )));
            }
        }
        let question_ids: HashSet<&QuestionId> = self.questions.iter().map(|q| &q.id).collect();

        let mut active_players = HashSet::new();
        for session in &self.sessions {
            if session.current_level == 0 || session.current_level > MAX_LEVEL {
                return Err(SnapshotError::Invalid(format!(
                    "Session '{}' is at level {} outside 1..={}",
                    session.id, session.current_level, MAX_LEVEL
                )));
            }

            if !session.is_active() {
                continue;
            }

            if !active_players.insert(&session.owner) {
                return Err(SnapshotError::Invalid(format!(
                    "Player '{}' has more than one active session",
                    session.owner
                )));
            }

            match &session.current_question {
                Some(id) if question_ids.contains(id) => {}
                Some(id) => {
                    return Err(SnapshotError::Invalid(format!(
                        "Session '{}' references question '{}' which doesn't exist",
                        session.id, id
                    )));
                }
                None => {
                    return Err(SnapshotError::Invalid(format!(
                        "Active session '{}' has no current question",
                        session.id
                    )));
                }
            }
        }

        Ok(())
    }
}

impl AppState {
    pub async fn export_state(&self) -> GameStateExport {
        let questions = self.questions.read().await.all();
        let sessions = self.sessions.all().await;
        let players = self.players.read().await.clone();
        GameStateExport::new(questions, sessions, players)
    }

    /// Replace all state with the snapshot contents
    pub async fn import_state(&self, export: GameStateExport) -> Result<(), SnapshotError> {
        export.validate()?;

        let question_count = export.questions.len();
        let session_count = export.sessions.len();

        self.questions.write().await.restore(export.questions);
        self.sessions.restore(export.sessions).await;
        *self.players.write().await = export.players;

        tracing::info!(
            "Imported state: {} questions, {} sessions, {} players",
            question_count,
            session_count,
            self.players.read().await.len()
        );
        Ok(())
    }

    /// Write a snapshot to `path`, via a temp file so readers never see a partial file
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let export = self.export_state().await;
        let json = serde_json::to_vec_pretty(&export)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// Load a snapshot from `path`. Returns false if there is no file yet.
    pub async fn load_snapshot(&self, path: &Path) -> Result<bool, SnapshotError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let export: GameStateExport = serde_json::from_slice(&bytes)?;
        self.import_state(export).await?;
        Ok(true)
    }
}
