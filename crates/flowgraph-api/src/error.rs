use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps every engine/storage/core error into an HTTP status, the way the
/// grounding codebase's route handlers collapse their own db errors to a
/// `StatusCode` at the edge rather than leaking internal error types.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<flowgraph_engine::EngineError> for ApiError {
    fn from(e: flowgraph_engine::EngineError) -> Self {
        use flowgraph_engine::EngineError::*;
        let status = match &e {
            StepNotFound(_) | StateCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NoMatchingWorkflow => StatusCode::NOT_FOUND,
            LoopMisuse(_) => StatusCode::BAD_REQUEST,
            Core(_) => StatusCode::BAD_GATEWAY,
            Storage(inner) => return ApiError::from_store(inner),
            Data(_) | Vector(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl ApiError {
    fn from_store(e: &flowgraph_storage::StoreError) -> Self {
        use flowgraph_storage::StoreError::*;
        let status = match e {
            WorkflowNotFound(_) | ExecutionNotPaused(_) => StatusCode::NOT_FOUND,
            StateCorruption(_) | Database(_) | Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<flowgraph_storage::StoreError> for ApiError {
    fn from(e: flowgraph_storage::StoreError) -> Self {
        ApiError::from_store(&e)
    }
}

impl From<flowgraph_core::CoreError> for ApiError {
    fn from(e: flowgraph_core::CoreError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}
