/// Wireflow: workflow execution engine for node-graph automations
///
/// Main entry point for the Wireflow server. Initializes configuration and
/// starts the HTTP server with workflow management and execution endpoints.

use wireflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Execution endpoints at /api/workflows/{id}/execute and /api/executions
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3006, overridable via env)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
