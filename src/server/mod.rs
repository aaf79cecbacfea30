pub mod error;
pub mod routes;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::AppConfig;
use routes::*;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(ADMIN_PASSWORD_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/rsvp",
            post(submit_rsvp_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler),
        )
        .route("/api/summary", get(summary_handler))
        .route("/api/event", get(event_handler))
        .route("/api/admin/rsvps", get(admin_list_handler))
        .route(
            "/api/admin/rsvps/:id",
            delete(admin_delete_handler).put(admin_update_handler),
        )
        .route("/api/admin/reload", post(admin_reload_handler))
        .route("/api/admin/export.csv", get(admin_export_csv_handler))
        .route("/api/admin/export.json", get(admin_export_json_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves until `shutdown` resolves. Peer addresses are exposed to handlers
/// for rate limiting.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cleanup = state
        .rate_limiter
        .spawn_cleanup(state.config.rate_limit.cleanup_interval());
    let app = build_router(state);

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error");

    cleanup.abort();
    result
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    info!("Initializing state...");
    let address = config.bind_address()?;
    let state = AppState::new(config).await.context("Failed to open database")?;

    info!("Binding to {address}");
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    serve(listener, state, shutdown_signal()).await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
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
}
