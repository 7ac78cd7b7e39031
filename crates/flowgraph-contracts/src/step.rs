use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// One node in a workflow graph.
///
/// `action_type` carries the fields specific to that action; everything
/// else (id, description, routing) is common to every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Step {
    pub step_id: String,
    pub description: String,
    #[serde(default = "default_on_success")]
    pub on_success: String,
    #[serde(default)]
    pub on_failure: Option<String>,
    #[serde(default)]
    pub output_key: Option<String>,
    #[serde(flatten)]
    pub action: ActionType,
}

fn default_on_success() -> String {
    crate::END.to_string()
}

impl Step {
    /// Every step id this step's edges may lead to (including loop-body and route targets).
    pub fn targets(&self) -> Vec<String> {
        let mut out = vec![self.on_success.clone()];
        if let Some(f) = &self.on_failure {
            out.push(f.clone());
        }
        match &self.action {
            ActionType::IntelligentRouter { routes, .. } => {
                out.extend(routes.values().cloned());
            }
            ActionType::StartLoop {
                loop_body_start_step_id,
                ..
            } => out.push(loop_body_start_step_id.clone()),
            _ => {}
        }
        out
    }
}

/// The 17 action kinds a step may be. Serialised with an internal `action_type` tag so
/// the stored JSON matches the field name used throughout the rest of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum ActionType {
    HumanInput {
        prompt_template: String,
    },
    FileIngestion {
        prompt_template: String,
        #[serde(default)]
        allowed_file_types: Vec<String>,
        #[serde(default)]
        max_files: Option<u32>,
    },
    FileStorage {
        prompt_template: String,
        #[serde(default)]
        allowed_file_types: Vec<String>,
        #[serde(default)]
        max_files: Option<u32>,
        storage_path: String,
    },
    LlmResponse {
        prompt_template: String,
        #[serde(default)]
        model_name: Option<String>,
    },
    ConditionCheck {
        prompt_template: String,
    },
    AgenticToolUse {
        prompt_template: String,
        #[serde(default)]
        tool_selection: ToolSelection,
        #[serde(default)]
        tool_names: Vec<String>,
    },
    DirectToolCall {
        target_tool_name: String,
        data_template: Value,
    },
    IntelligentRouter {
        prompt_template: String,
        routes: std::collections::HashMap<String, String>,
    },
    HttpRequest {
        http_method: String,
        url_template: String,
        #[serde(default)]
        headers_template: Value,
        #[serde(default)]
        body_template: Value,
    },
    DatabaseSave {
        table_name: String,
        data_template: Value,
        #[serde(default)]
        primary_key_columns: Vec<String>,
    },
    DatabaseQuery {
        query_template: String,
    },
    VectorDbIngestion {
        prompt_template: String,
        collection_name: String,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
        #[serde(default = "default_chunk_overlap")]
        chunk_overlap: usize,
        #[serde(default)]
        embedding_model: Option<String>,
    },
    VectorDbQuery {
        prompt_template: String,
        collection_name: String,
        #[serde(default)]
        top_k: Option<usize>,
        #[serde(default)]
        embedding_model: Option<String>,
    },
    CrossEncoderRerank {
        prompt_template: String,
        #[serde(default)]
        rerank_top_n: Option<usize>,
    },
    WorkflowCall {
        target_workflow_id: i64,
        #[serde(default)]
        input_mappings: Value,
    },
    DisplayMessage {
        prompt_template: String,
    },
    StartLoop {
        input_collection_variable: String,
        current_item_output_key: String,
        loop_body_start_step_id: String,
    },
    EndLoop {
        #[serde(default)]
        value_to_return: Option<String>,
    },
}

impl ActionType {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionType::HumanInput { .. } => "human_input",
            ActionType::FileIngestion { .. } => "file_ingestion",
            ActionType::FileStorage { .. } => "file_storage",
            ActionType::LlmResponse { .. } => "llm_response",
            ActionType::ConditionCheck { .. } => "condition_check",
            ActionType::AgenticToolUse { .. } => "agentic_tool_use",
            ActionType::DirectToolCall { .. } => "direct_tool_call",
            ActionType::IntelligentRouter { .. } => "intelligent_router",
            ActionType::HttpRequest { .. } => "http_request",
            ActionType::DatabaseSave { .. } => "database_save",
            ActionType::DatabaseQuery { .. } => "database_query",
            ActionType::VectorDbIngestion { .. } => "vector_db_ingestion",
            ActionType::VectorDbQuery { .. } => "vector_db_query",
            ActionType::CrossEncoderRerank { .. } => "cross_encoder_rerank",
            ActionType::WorkflowCall { .. } => "workflow_call",
            ActionType::DisplayMessage { .. } => "display_message",
            ActionType::StartLoop { .. } => "start_loop",
            ActionType::EndLoop { .. } => "end_loop",
        }
    }

    /// Whether this action kind can ever suspend execution for external input.
    pub fn can_suspend(&self) -> bool {
        matches!(
            self,
            ActionType::HumanInput { .. } | ActionType::FileIngestion { .. } | ActionType::FileStorage { .. }
        )
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum ToolSelection {
    #[default]
    Auto,
    Manual,
    None,
}
