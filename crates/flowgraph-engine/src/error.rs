use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("no matching workflow for query")]
    NoMatchingWorkflow,

    #[error("state corruption: {0}")]
    StateCorruption(String),

    #[error("loop misuse: {0}")]
    LoopMisuse(String),

    #[error(transparent)]
    Core(#[from] flowgraph_core::CoreError),

    #[error(transparent)]
    Storage(#[from] flowgraph_storage::StoreError),

    #[error(transparent)]
    Data(#[from] flowgraph_data::DataError),

    #[error(transparent)]
    Vector(#[from] flowgraph_vector::VectorError),
}

impl EngineError {
    pub fn step_not_found(id: impl Into<String>) -> Self {
        EngineError::StepNotFound(id.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        EngineError::StateCorruption(msg.into())
    }

    pub fn loop_misuse(msg: impl Into<String>) -> Self {
        EngineError::LoopMisuse(msg.into())
    }
}
