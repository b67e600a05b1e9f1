// src/lib.rs
//! A small polling site: people register, create questions with a set of
//! choices, vote once per question and look at the results.
//!
//! Pages are rendered on the server. Data lives in PostgreSQL when
//! `DATABASE_URL` is set and in memory otherwise.
use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod poll;
pub mod routes;
pub mod state;
pub mod store;
pub mod templates;

use config::Config;
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    // RUST_LOG may come from .env
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    info!("Initializing state...");
    tokio::fs::create_dir_all(&config.media_root).await?;
    let state = State::new(config).await?;
    let app = routes::create_routes(state.clone());

    let address = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("Server running on {address}");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
