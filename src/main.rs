use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use millionaire::{
    api, auth,
    config::AppConfig,
    persist,
    state::{questions::QuestionBank, AppState},
};

async fn load_question_bank(config: &AppConfig) -> QuestionBank {
    let loaded = match &config.questions_file {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(json) => QuestionBank::from_json(&json).inspect(|bank| {
                tracing::info!("Loaded {} questions from {}", bank.len(), path.display())
            }),
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                QuestionBank::with_defaults()
            }
        },
        None => QuestionBank::with_defaults(),
    };

    let bank = loaded.unwrap_or_else(|e| {
        tracing::error!(
            "Failed to load questions: {}. Starting with an empty bank.",
            e
        );
        QuestionBank::new()
    });

    let missing = bank.missing_levels();
    if !missing.is_empty() {
        tracing::warn!(
            "No questions at levels {:?}; games will stop there until questions are imported",
            missing
        );
    }
    bank
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "millionaire=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Millionaire...");

    let config = AppConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());

    let bank = load_question_bank(&config).await;
    let state = Arc::new(AppState::with_config(bank, config.clone()));

    if let Some(path) = &config.snapshot_file {
        match state.load_snapshot(path).await {
            Ok(true) => tracing::info!("Restored state from {}", path.display()),
            Ok(false) => tracing::info!("No snapshot at {}, starting fresh", path.display()),
            Err(e) => tracing::error!("Failed to restore snapshot {}: {}", path.display(), e),
        }
        persist::spawn_snapshot_writer(state.clone(), path.clone(), config.snapshot_interval);
    }

    let app = api::build_router(state.clone(), auth_config);

    tracing::info!("Listening on http://{}", config.bind_addr);
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    if let Some(path) = &config.snapshot_file {
        match state.save_snapshot(path).await {
            Ok(()) => tracing::info!("Final snapshot written to {}", path.display()),
            Err(e) => tracing::error!("Failed to write final snapshot: {}", e),
        }
    }
}
