use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine as _;
use flowgraph_contracts::PauseType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartExecutionRequest {
    pub query: String,
    #[serde(default)]
    pub context: Value,
}

/// One uploaded file, base64-encoded for transport over plain JSON.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_base64: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResumeExecutionRequest {
    /// Used as-is when resuming a `human_input` step, or when the caller has
    /// already extracted text/stored files itself.
    #[serde(default)]
    pub value: Value,
    /// When present, each file is run through the file extractor and the
    /// resulting text blocks become `value` (a `file_ingestion`/`file_storage`
    /// resume). Mutually exclusive with a non-null `value`.
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// What the caller sees after starting or resuming an execution: either it
/// finished, it's waiting on a human, or it failed outright.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResponse {
    Completed { execution_id: String, final_response: Option<String> },
    Suspended { execution_id: String, pause_type: PauseType, prompt: String },
    Failed { execution_id: String, error: String },
}

impl From<flowgraph_engine::EngineResult> for ExecutionResponse {
    fn from(result: flowgraph_engine::EngineResult) -> Self {
        use flowgraph_engine::EngineResult::*;
        match result {
            Completed { envelope } => ExecutionResponse::Completed {
                execution_id: envelope.execution_id,
                final_response: envelope.final_response,
            },
            Suspended { envelope, pause_type, prompt } => {
                ExecutionResponse::Suspended { execution_id: envelope.execution_id, pause_type, prompt }
            }
            Failed { envelope, error } => ExecutionResponse::Failed { execution_id: envelope.execution_id, error },
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/executions", post(start_execution))
        .route("/v1/workflows/:id/executions", post(start_execution_by_id))
        .route("/v1/executions/:execution_id/resume", post(resume_execution))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/executions",
    request_body = StartExecutionRequest,
    responses(
        (status = 200, description = "Execution started", body = ExecutionResponse),
        (status = 404, description = "No workflow matches the query"),
    ),
    tag = "executions"
)]
pub async fn start_execution(
    State(state): State<AppState>,
    Json(req): Json<StartExecutionRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let result = state.engine.start_by_query(req.query, req.context).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/v1/workflows/{id}/executions",
    params(("id" = i64, Path, description = "Workflow id")),
    request_body = StartExecutionRequest,
    responses(
        (status = 200, description = "Execution started", body = ExecutionResponse),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "executions"
)]
pub async fn start_execution_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StartExecutionRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let result = state.engine.start_by_id(id, req.query, req.context).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/v1/executions/{execution_id}/resume",
    params(("execution_id" = String, Path, description = "Execution id")),
    request_body = ResumeExecutionRequest,
    responses(
        (status = 200, description = "Execution resumed", body = ExecutionResponse),
        (status = 404, description = "No paused execution with that id"),
    ),
    tag = "executions"
)]
pub async fn resume_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
    Json(req): Json<ResumeExecutionRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let value = if req.files.is_empty() {
        req.value
    } else {
        let mut texts = Vec::with_capacity(req.files.len());
        for file in &req.files {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&file.content_base64)
                .map_err(|e| ApiError::bad_request(format!("'{}' is not valid base64: {e}", file.file_name)))?;
            let text = state.engine.services.file_extractor.extract(&file.file_name, &bytes).await?;
            texts.push(Value::String(text));
        }
        Value::Array(texts)
    };
    let result = state.engine.resume(&execution_id, value).await?;
    Ok(Json(result.into()))
}
