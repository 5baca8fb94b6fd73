//! Shelfwise API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Order search with view dispatch
//! - Order patching and vendor management
//! - Report statements and the dashboard overview
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use shelfwise_common::{
    config::{AppConfig, CutoffProvider},
    db::{DbPool, Repository},
    metrics,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repo: Repository,
    pub cutoff: Arc<CutoffProvider>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Shelfwise API Gateway v{}", shelfwise_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // The CDL cutoff date is runtime-mutable; handlers read it through the
    // provider instead of capturing it here
    let cutoff = Arc::new(CutoffProvider::load(&config.report.cutoff_path).await?);

    // Create app state
    let state = AppState {
        config: config.clone(),
        repo: Repository::new(db.clone()),
        db,
        cutoff,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Order endpoints
        .route("/orders/search", post(handlers::orders::search))
        .route("/orders/general-order", patch(handlers::orders::patch_general_order))
        .route("/orders/cdl-order", patch(handlers::orders::patch_cdl_order))
        .route("/orders/cdl", post(handlers::orders::create_cdl))
        .route("/orders/cdl/{book_id}", delete(handlers::orders::revoke_cdl))
        .route("/orders/checked", post(handlers::orders::set_checked))
        .route("/orders/attention", post(handlers::orders::set_attention))
        .route("/orders/note/{book_id}", delete(handlers::orders::delete_note))
        // Vendor endpoints
        .route("/vendors", get(handlers::vendors::list_vendors))
        .route("/vendors", post(handlers::vendors::add_vendor))
        .route("/vendors", patch(handlers::vendors::update_vendor))
        .route("/vendors/{code}", get(handlers::vendors::get_vendor))
        .route("/vendors/{code}", delete(handlers::vendors::delete_vendor))
        // Data endpoints
        .route("/data/metadata", get(handlers::data::metadata))
        .route("/overview", get(handlers::overview::overview))
        // Report export endpoints
        .route("/report/statement", post(handlers::reports::statement))
        // Admin endpoints
        .route("/admin/cdl-cutoff", get(handlers::admin::get_cutoff))
        .route("/admin/cdl-cutoff", put(handlers::admin::set_cutoff))
        .route("/admin/cdl-cutoff/reload", post(handlers::admin::reload_cutoff));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
