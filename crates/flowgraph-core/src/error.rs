// Error taxonomy shared by the template evaluator, tool registry, and graph loader.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("template error: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("loop misuse: {0}")]
    LoopMisuse(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn template(msg: impl Into<String>) -> Self {
        CoreError::Template(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Configuration(msg.into())
    }

    pub fn loop_misuse(msg: impl Into<String>) -> Self {
        CoreError::LoopMisuse(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        CoreError::Llm(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        CoreError::Tool(msg.into())
    }
}
