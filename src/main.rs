//! Roster bot binary entrypoint wiring the REST, SSE, snapshot and gateway layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_bot_back::{
    config::AppConfig,
    dao::snapshot_store::JsonFileStore,
    gateway::{ChatGateway, RecordingGateway},
    routes,
    services::{background, reaction_service},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    let gateway = build_gateway(&config)?;

    let app_state = AppState::restore(config, store, gateway)
        .await
        .context("restoring roster snapshot")?;

    let jobs = background::spawn(app_state.clone());
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

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

    jobs.shutdown();
    flush(&app_state).await;
    Ok(())
}

/// Pick the HTTP gateway when an adapter URL is configured, the recording one otherwise.
fn build_gateway(config: &AppConfig) -> anyhow::Result<Arc<dyn ChatGateway>> {
    match config.gateway_url.as_deref() {
        #[cfg(feature = "http-gateway")]
        Some(url) => {
            let gateway = roster_bot_back::gateway::HttpGateway::new(url, config.host_token.as_deref())
                .context("building chat gateway client")?;
            info!(url, "forwarding chat actions to the host adapter");
            Ok(Arc::new(gateway))
        }
        #[cfg(not(feature = "http-gateway"))]
        Some(url) => {
            warn!(url, "built without the http-gateway feature; chat actions are only recorded");
            Ok(Arc::new(RecordingGateway::new()))
        }
        None => {
            warn!("no gateway URL configured; chat actions are only recorded");
            Ok(Arc::new(RecordingGateway::new()))
        }
    }
}

/// Apply queued reactions and write the final snapshots before exiting.
async fn flush(state: &SharedState) {
    reaction_service::drain_pending(state).await;
    if let Err(err) = state.persist_rosters().await {
        warn!(error = %err, "failed to save rosters on shutdown");
    }
    if let Err(err) = state.persist_nicknames().await {
        warn!(error = %err, "failed to save nicknames on shutdown");
    }
    info!("state flushed; bye");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
