//! Trivia Board Back binary entrypoint wiring the relay, snapshot store, and HTTP layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::snapshot_store::fs::FsSnapshotStore;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = Arc::new(FsSnapshotStore::new(config.state_file().clone()));

    let app_state = AppState::new(config, store);
    rehydrate(&app_state).await;

    // Persist the mirror in the background, debounced.
    tokio::spawn(services::flush_service::run(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Load the persisted snapshot into the relay mirror before serving clients,
/// so late joiners hydrate from a board that already reflects the last game.
async fn rehydrate(state: &SharedState) {
    match state.snapshot_store().load().await {
        Ok(snapshot) => {
            state.hydrate_mirror(&snapshot).await;
            info!(
                round = snapshot.current_round,
                teams = snapshot.teams.len(),
                completed = snapshot.completed_questions.len(),
                "mirror rehydrated from snapshot"
            );
        }
        Err(err) => {
            // Recoverable miss: an empty board is a valid starting point.
            warn!(error = %err, "failed to load snapshot; starting from defaults");
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
