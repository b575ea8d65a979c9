/// Workflow execution endpoints
///
/// Runs either a registered workflow or one supplied inline by the editor
/// (which keeps graphs client-side). The response body is the run's trace;
/// a failed run answers 422 with the error and the partial trace, so the
/// editor can render exactly where the run stopped.

use crate::api::workflows::AppState;
use crate::runtime::{ExecutionLogEntry, RunFailure, WorkflowEngine};
use crate::workflow::{compile_workflow, types::Workflow, CompiledWorkflow};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Request body for inline execution
#[derive(Debug, Deserialize)]
pub struct ExecuteInlineRequest {
    pub workflow: Workflow,
}

/// Create execution routes
pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows/{id}/execute", post(execute_registered))
        .route("/api/executions", post(execute_inline))
}

/// Execute a registered workflow
///
/// POST /api/workflows/:id/execute
/// Returns: { "runId": "...", "status": "completed", "trace": [...] }
async fn execute_registered(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(compiled) = state.registry.get(&id) else {
        tracing::warn!("Execution requested for unknown workflow: {}", id);
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("workflow '{}' not found", id) })),
        ));
    };

    run_workflow(&state, compiled).await
}

/// Compile and execute a workflow supplied in the request body
///
/// POST /api/executions
/// Body: { "workflow": { ... } }
async fn execute_inline(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteInlineRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let compiled = match compile_workflow(payload.workflow) {
        Ok(compiled) => compiled,
        Err(e) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            ));
        }
    };

    run_workflow(&state, compiled).await
}

async fn run_workflow(
    state: &AppState,
    compiled: CompiledWorkflow,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let workflow_id = compiled.workflow.id.clone();
    let run_id = Uuid::new_v4();
    let started = std::time::Instant::now();

    tracing::info!("🚀 Starting workflow execution: {} (run {})", workflow_id, run_id);

    let engine = WorkflowEngine::new(
        compiled.workflow,
        Arc::clone(&state.executor),
        &state.engine,
    );

    match engine.execute().await {
        Ok(trace) => {
            tracing::info!(
                "🎉 Workflow '{}' completed in {:?} with {} trace entries",
                workflow_id,
                started.elapsed(),
                trace.len()
            );
            Ok(Json(run_report(run_id, "completed", None, &trace)))
        }
        Err(RunFailure { error, trace }) => {
            tracing::error!(
                "❌ Workflow '{}' failed after {:?}: {}",
                workflow_id,
                started.elapsed(),
                error
            );
            // 422 for execution failures; the partial trace stays observable
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(run_report(run_id, "failed", Some(error.to_string()), &trace)),
            ))
        }
    }
}

fn run_report(
    run_id: Uuid,
    status: &str,
    error: Option<String>,
    trace: &[ExecutionLogEntry],
) -> Value {
    let mut report = json!({
        "runId": run_id.to_string(),
        "status": status,
        "trace": trace,
    });
    if let Some(message) = error {
        report["error"] = json!(message);
    }
    report
}
