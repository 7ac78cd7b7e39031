use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("execution state not found or not paused: {0}")]
    ExecutionNotPaused(String),

    #[error("state corruption: {0}")]
    StateCorruption(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn workflow_not_found(id: impl std::fmt::Display) -> Self {
        StoreError::WorkflowNotFound(id.to_string())
    }

    pub fn execution_not_paused(id: impl std::fmt::Display) -> Self {
        StoreError::ExecutionNotPaused(id.to_string())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        StoreError::StateCorruption(msg.into())
    }
}
