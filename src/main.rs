//! Todo MCP Server
//!
//! A Model Context Protocol server managing todos in a single JSON file, with
//! an HTML widget for clients that can render one.

mod api;
mod config;
mod errors;
mod models;
mod storage;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{RequestIds, Widget};
use config::Config;
use storage::{RetryPolicy, TodoStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TodoStore>,
    pub widget: Arc<Widget>,
    pub config: Arc<Config>,
    pub request_ids: Arc<RequestIds>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Todo MCP Server");
    tracing::info!("Assets directory: {:?}", config.assets_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize storage
    let store = TodoStore::new(config.file_path.clone()).with_retry_policies(
        RetryPolicy::new(config.max_retries, config.read_retry_delay),
        RetryPolicy::new(config.max_retries, config.write_retry_delay),
    );
    tracing::info!("Todo file: {:?}", store.file_path());
    store.initialize().await?;
    let stats = store.stats().await?;
    tracing::info!(
        "Storage ready with {} todos ({} completed)",
        stats.total,
        stats.completed
    );

    // Load widget template
    let widget = Widget::load(&config.assets_dir);

    // Create application state
    let state = AppState {
        store: Arc::new(store),
        widget: Arc::new(widget),
        config: Arc::new(config.clone()),
        request_ids: Arc::new(RequestIds::new()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(api::handle_rpc))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let initialized = state.store.is_ready().await;
    let storage = state.store.check_health().await;

    let (status_code, status) = if initialized && storage.healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "initialized": initialized,
            "storage": storage,
        })),
    )
}
