//! HTTP API endpoints.
//!
//! Public read-only endpoints (leaderboard, prize ladder, health) plus admin
//! endpoints for loading questions and exporting/importing game state.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, AuthConfig};
use crate::error::{ErrorKind, GameError};
use crate::state::export::GameStateExport;
use crate::state::questions::{LevelStats, LoadReport};
use crate::state::{prize, AppState};
use crate::types::{LeaderboardEntry, PrizeLevel, QuestionInput};
use crate::ws;

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NoActiveSession => StatusCode::NOT_FOUND,
            ErrorKind::DataIntegrity => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
        };
        let body = serde_json::json!({ "code": self.code(), "msg": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Build the full application router
pub fn build_router(state: Arc<AppState>, auth_config: Arc<AuthConfig>) -> Router {
    let admin_routes = Router::new()
        .route("/api/questions", post(import_questions))
        .route("/api/questions/stats", get(question_stats))
        .route("/api/state/export", get(export_state))
        .route("/api/state/import", post(import_state))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/prizes", get(prizes))
        .route("/api/health", get(health))
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}

/// GET /api/leaderboard?limit=N
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Json<Vec<LeaderboardEntry>> {
    let limit = params.limit.unwrap_or(state.config.leaderboard_limit);
    Json(state.get_leaderboard(limit).await)
}

/// GET /api/prizes
pub async fn prizes() -> Json<Vec<PrizeLevel>> {
    Json(prize::ladder())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub questions: usize,
    /// Levels with no questions; games cannot reach past the first of these
    pub missing_levels: Vec<u32>,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let bank = state.questions.read().await;
    let missing_levels = bank.missing_levels();
    Json(HealthResponse {
        status: if missing_levels.is_empty() {
            "ok"
        } else {
            "degraded"
        },
        questions: bank.len(),
        missing_levels,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuestionsParams {
    #[serde(default)]
    pub replace: bool,
}

/// Bulk-load questions.
///
/// POST /api/questions?replace=true|false
///
/// The whole batch is rejected if any record is invalid. Reseeding closes
/// games whose current question disappears.
pub async fn import_questions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportQuestionsParams>,
    Json(inputs): Json<Vec<QuestionInput>>,
) -> Result<Json<LoadReport>, GameError> {
    let report = state.load_questions(inputs, params.replace).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct QuestionStatsResponse {
    pub total: usize,
    pub levels: Vec<LevelStats>,
    pub missing_levels: Vec<u32>,
}

/// GET /api/questions/stats
pub async fn question_stats(State(state): State<Arc<AppState>>) -> Json<QuestionStatsResponse> {
    let bank = state.questions.read().await;
    Json(QuestionStatsResponse {
        total: bank.len(),
        levels: bank.stats(),
        missing_levels: bank.missing_levels(),
    })
}

/// Export the entire game state as JSON.
///
/// GET /api/state/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<GameStateExport> {
    Json(state.export_state().await)
}

/// Import a game state snapshot.
///
/// POST /api/state/import
///
/// Replaces all current state with the imported data.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(export): Json<GameStateExport>,
) -> Response {
    match state.import_state(export).await {
        Ok(()) => (StatusCode::OK, "State imported successfully").into_response(),
        Err(e) => {
            tracing::error!("State import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {}", e)).into_response()
        }
    }
}
