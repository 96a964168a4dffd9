use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{error, info};

use super::{services, state::AppState};
use crate::config::Config;
use crate::store::FjallStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes with body limit and request decompression applied
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.api.max_payload_bytes.as_usize();

    Router::new()
        .route("/spools/remaining", post(services::batch_remaining))
        .route("/spools/{serial}/baseline", get(services::get_baseline))
        .route("/spools/{serial}/usage", get(services::get_usage))
        .route("/spools/{serial}/remaining", get(services::get_remaining))
        .route(
            "/spools/{serial}/assignment-usage",
            get(services::get_assignment_usage),
        )
        .route("/reports/daily", get(services::daily_report))
        .route("/reconciliations", post(services::reconcile))
        .route("/operators/metrics", get(services::metrics))
        .route("/operators/health", get(services::health))
        .route("/health", get(services::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        // gzip request bodies are inflated before the JSON extractor sees them
        .layer(RequestDecompressionLayer::new())
}

/// Open the store and serve until SIGINT/SIGTERM. `address` overrides
/// `server.bind_addr`.
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    info!(path = %config.store.fjall_path.display(), "Opening Fjall store");
    let store = FjallStore::open(&config.store.fjall_path)
        .map_err(|e| format!("Failed to open Fjall store: {}", e))?;

    let app = router(AppState::new(config, store.clone()));

    let listener = TcpListener::bind(address).await?;
    info!(%address, "SpoolBox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store
        .persist()
        .map_err(|e| format!("Failed to persist Fjall store: {}", e))?;
    info!("Store flushed, bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
