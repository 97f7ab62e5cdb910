//! Error types for game operations and snapshot persistence

use crate::types::{QuestionId, SessionId};

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by the session state machine and its callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid choice '{0}' (expected A, B, C, D or TIMEOUT)")]
    InvalidChoice(String),

    #[error("Unknown lifeline '{0}'")]
    InvalidLifeline(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("No active game session")]
    NoActiveSession,

    #[error("No questions available at level {0}")]
    NoQuestionsAtLevel(u32),

    #[error("No question available for next level {0}")]
    NoQuestionForNextLevel(u32),

    #[error("Question {0} is no longer in the question bank")]
    MissingQuestion(QuestionId),

    #[error("Session {0} was modified concurrently")]
    ConcurrencyConflict(SessionId),
}

/// Broad error classes, deciding how a caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Re-prompt the player, session untouched
    InvalidInput,
    /// Redirect to start/result
    NoActiveSession,
    /// Operator-facing fault, session left active and unresolved
    DataIntegrity,
    /// Transient, retry once
    ConcurrencyConflict,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidChoice(_)
            | GameError::InvalidLifeline(_)
            | GameError::InvalidQuestion(_)
            | GameError::InvalidDisplayName(_) => ErrorKind::InvalidInput,
            GameError::NoActiveSession => ErrorKind::NoActiveSession,
            GameError::NoQuestionsAtLevel(_)
            | GameError::NoQuestionForNextLevel(_)
            | GameError::MissingQuestion(_) => ErrorKind::DataIntegrity,
            GameError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
        }
    }

    /// Stable code for protocol error messages
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidChoice(_) => "INVALID_CHOICE",
            GameError::InvalidLifeline(_) => "INVALID_LIFELINE",
            GameError::InvalidQuestion(_) => "INVALID_QUESTION",
            GameError::InvalidDisplayName(_) => "INVALID_DISPLAY_NAME",
            GameError::NoActiveSession => "NO_ACTIVE_SESSION",
            GameError::NoQuestionsAtLevel(_) => "NO_QUESTIONS_AT_LEVEL",
            GameError::NoQuestionForNextLevel(_) => "NO_QUESTION_FOR_NEXT_LEVEL",
            GameError::MissingQuestion(_) => "MISSING_QUESTION",
            GameError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
        }
    }
}

/// Errors while reading, writing or validating a state snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot rejected: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GameError::InvalidChoice("X".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            GameError::NoActiveSession.kind(),
            ErrorKind::NoActiveSession
        );
        assert_eq!(
            GameError::NoQuestionForNextLevel(7).kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(
            GameError::ConcurrencyConflict("s".into()).kind(),
            ErrorKind::ConcurrencyConflict
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GameError::NoQuestionForNextLevel(7).to_string(),
            "No question available for next level 7"
        );
        assert_eq!(GameError::NoActiveSession.code(), "NO_ACTIVE_SESSION");
    }
}
