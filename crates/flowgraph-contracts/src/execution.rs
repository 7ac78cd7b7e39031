use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Durable state of one in-flight or paused execution.
///
/// Owned exclusively by the engine while a step is running, and by the
/// persistence store while suspended; never shared concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct ExecutionEnvelope {
    pub execution_id: String,
    pub workflow_id: i64,
    pub query: String,
    #[serde(default)]
    pub initial_context: Value,
    #[serde(default)]
    pub collected_inputs: HashMap<String, Value>,
    #[serde(default)]
    pub step_history: Vec<HistoryEntry>,
    pub current_step_id: String,
    #[serde(default)]
    pub final_response: Option<String>,
}

impl ExecutionEnvelope {
    pub fn new(execution_id: String, workflow_id: i64, query: String, initial_context: Value, start_step_id: String) -> Self {
        Self {
            execution_id,
            workflow_id,
            query,
            initial_context,
            collected_inputs: HashMap::new(),
            step_history: Vec::new(),
            current_step_id: start_step_id,
            final_response: None,
        }
    }

    pub fn get_state_field(&self, key: &str) -> Option<Value> {
        match key {
            "execution_id" => Some(Value::String(self.execution_id.clone())),
            "workflow_id" => Some(Value::from(self.workflow_id)),
            "query" => Some(Value::String(self.query.clone())),
            "current_step_id" => Some(Value::String(self.current_step_id.clone())),
            "final_response" => self.final_response.clone().map(Value::String),
            _ => None,
        }
    }
}

/// One completed (or pause/resume marker) step in an execution's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct HistoryEntry {
    pub step_id: String,
    pub action_type: String,
    pub success: bool,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn success(step_id: impl Into<String>, action_type: impl Into<String>, output: Value) -> Self {
        Self {
            step_id: step_id.into(),
            action_type: action_type.into(),
            success: true,
            output: Some(output),
            error: None,
            at: Utc::now(),
        }
    }

    pub fn failure(step_id: impl Into<String>, action_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            action_type: action_type.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            at: Utc::now(),
        }
    }
}

/// What a step execution did, as understood by the driver loop.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Execution must halt until external input arrives.
    Suspend {
        pause_type: PauseType,
        prompt: String,
        output_key: String,
        allowed_file_types: Vec<String>,
        max_files: Option<u32>,
        storage_path: Option<String>,
    },
    /// The step completed; advance according to `next_step` unless overridden.
    Success {
        output: Option<Value>,
        next_step_override: Option<String>,
    },
    /// The step failed; the driver loop follows `on_failure` if present.
    Failure { error: String },
    /// Emitted by `start_loop` to enter the loop body.
    EnterLoopBody { next_step: String },
    /// Emitted by `end_loop` to return control to the owning `start_loop`.
    LoopIterationComplete { output: Value },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum PauseType {
    AwaitingInput,
    AwaitingFileUpload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum ExecutionStatus {
    Paused,
    Completed,
    Failed,
}
