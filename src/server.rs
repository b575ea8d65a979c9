/// Server setup and initialization
///
/// Wires together all components: script engine, clipboard sink, node
/// executor, workflow registry, and HTTP routes. Provides the main
/// application factory function for creating the Axum app.

use crate::{
    api::{
        executions::create_execution_routes,
        workflows::{create_workflow_routes, AppState},
    },
    config::Config,
    runtime::{LuaScriptEngine, MemoryClipboard, NodeExecutor},
    workflow::registry::WorkflowRegistry,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the main Axum application with all routes
///
/// Initializes all components and wires them together. A headless backend
/// has no system clipboard, so CLIPBOARD nodes write to an in-process slot.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("⚙️ Initializing node executor");
    let script_engine = Arc::new(LuaScriptEngine::new());
    let clipboard = Arc::new(MemoryClipboard::new());
    let executor = NodeExecutor::new(&config.engine, script_engine, clipboard)
        .map_err(|e| anyhow::anyhow!("Failed to initialize node executor: {}", e))?;

    tracing::info!("📊 Initializing workflow registry");
    let registry = Arc::new(WorkflowRegistry::new());

    let app_state = AppState {
        registry,
        executor: Arc::new(executor),
        engine: config.engine.clone(),
    };

    tracing::info!("📡 Creating HTTP router");
    let app = Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Workflow management API routes
        .merge(create_workflow_routes().with_state(app_state.clone()))
        // Execution routes
        .merge(create_execution_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Wireflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
