/// Workflow management REST API endpoints
///
/// CRUD operations against the in-memory registry. Registration compiles the
/// workflow (graph validation, START resolution) before it becomes
/// executable; updates swap the registry pointer atomically so runs already
/// in flight keep their snapshot.

use crate::{
    config::EngineConfig,
    runtime::NodeExecutor,
    workflow::{registry::WorkflowRegistry, types::Workflow},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Hot-reload registry for in-memory workflows
    pub registry: Arc<WorkflowRegistry>,
    /// Node executor shared by all runs
    pub executor: Arc<NodeExecutor>,
    /// Per-run engine bounds
    pub engine: EngineConfig,
}

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow creation and update
#[derive(Debug, Deserialize)]
pub struct SubmitWorkflowRequest {
    pub workflow: Workflow,
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", put(update_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "id": "...", "name": "...", "nodes": [...], "edges": [...] } }
async fn create_workflow(
    State(state): State<AppState>,
    Json(payload): Json<SubmitWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, (StatusCode, Json<Value>)> {
    let workflow = payload.workflow;

    if workflow.id.is_empty() || workflow.name.is_empty() {
        return Err(bad_request("workflow id and name are required"));
    }
    if state.registry.contains(&workflow.id) {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": format!("workflow '{}' already exists", workflow.id) })),
        ));
    }

    let id = workflow.id.clone();
    let name = workflow.name.clone();
    if let Err(e) = state.registry.upsert(workflow) {
        tracing::warn!("Rejected workflow '{}': {}", id, e);
        return Err(bad_request(e.to_string()));
    }

    tracing::info!("🔥 Created workflow: {} ({})", id, name);

    Ok(Json(WorkflowResponse {
        id,
        message: format!("Workflow '{}' created successfully", name),
    }))
}

/// List all workflows
///
/// GET /api/workflows
/// Returns: { "workflows": [{ "id": "...", "name": "...", ... }] }
async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "workflows": state.registry.summaries() }))
}

/// Get a specific workflow by ID
///
/// GET /api/workflows/:id
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, StatusCode> {
    match state.registry.get(&id) {
        Some(compiled) => Ok(Json(compiled.workflow)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Update an existing workflow
///
/// PUT /api/workflows/:id
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, (StatusCode, Json<Value>)> {
    let mut workflow = payload.workflow;
    // The URL parameter is authoritative for the id
    workflow.id = id.clone();

    if workflow.name.is_empty() {
        return Err(bad_request("workflow name is required"));
    }
    if !state.registry.contains(&id) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("workflow '{}' not found", id) })),
        ));
    }

    let name = workflow.name.clone();
    if let Err(e) = state.registry.upsert(workflow) {
        tracing::warn!("Rejected workflow update '{}': {}", id, e);
        return Err(bad_request(e.to_string()));
    }

    tracing::info!("🔥 Hot-reloaded workflow: {} ({})", id, name);

    Ok(Json(WorkflowResponse {
        id,
        message: format!("Workflow '{}' updated successfully", name),
    }))
}

/// Delete a workflow
///
/// DELETE /api/workflows/:id
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if state.registry.remove(&id) {
        tracing::info!("Deleted workflow: {}", id);
        Ok(Json(json!({ "message": "Workflow deleted successfully" })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}
