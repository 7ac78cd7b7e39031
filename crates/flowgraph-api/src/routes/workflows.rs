use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use flowgraph_contracts::{Workflow, WorkflowSummary};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveWorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    /// The authoring tool's `{nodes, edges}` graph.
    pub graph: Value,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/workflows", post(save_workflow).get(list_workflows))
        .route("/v1/workflows/:id", get(get_workflow).delete(delete_workflow))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/workflows",
    request_body = SaveWorkflowRequest,
    responses(
        (status = 201, description = "Workflow saved", body = Workflow),
        (status = 400, description = "Invalid graph"),
    ),
    tag = "workflows"
)]
pub async fn save_workflow(
    State(state): State<AppState>,
    Json(req): Json<SaveWorkflowRequest>,
) -> Result<(StatusCode, Json<Workflow>), ApiError> {
    let candidate = flowgraph_core::load_workflow_from_graph(0, req.name, req.description, req.owner, req.triggers, req.graph)?;
    candidate.validate().map_err(|msg| flowgraph_core::CoreError::template(msg))?;
    let saved = state.db.save_workflow(&candidate).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[utoipa::path(
    get,
    path = "/v1/workflows",
    responses((status = 200, description = "List of workflows", body = Vec<WorkflowSummary>)),
    tag = "workflows"
)]
pub async fn list_workflows(State(state): State<AppState>) -> Result<Json<Vec<WorkflowSummary>>, ApiError> {
    Ok(Json(state.db.list_workflows().await?))
}

#[utoipa::path(
    get,
    path = "/v1/workflows/{id}",
    params(("id" = i64, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow found", body = Workflow),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "workflows"
)]
pub async fn get_workflow(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Workflow>, ApiError> {
    Ok(Json(state.db.get_workflow(id).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/workflows/{id}",
    params(("id" = i64, Path, description = "Workflow id")),
    responses(
        (status = 204, description = "Workflow deleted"),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "workflows"
)]
pub async fn delete_workflow(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.db.delete_workflow(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
