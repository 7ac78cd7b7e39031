mod data;
mod http;
mod llm;
mod suspend;
mod vector;

use flowgraph_contracts::{ActionType, ExecutionEnvelope, Step, StepOutcome};

use crate::services::Services;

/// Runs every action kind except `start_loop`, `end_loop`, and `workflow_call`,
/// which the driver loop handles directly because they need the loop stack
/// and/or recursive sub-execution that a step-local handler can't see.
pub async fn dispatch(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    match &step.action {
        ActionType::HumanInput { .. } => suspend::human_input(step, envelope),
        ActionType::FileIngestion { .. } => suspend::file_ingestion(step, envelope),
        ActionType::FileStorage { .. } => suspend::file_storage(step, envelope),
        ActionType::DisplayMessage { .. } => suspend::display_message(step, envelope),
        ActionType::LlmResponse { .. } => llm::llm_response(step, envelope, services).await,
        ActionType::ConditionCheck { .. } => llm::condition_check(step, envelope, services).await,
        ActionType::AgenticToolUse { .. } => llm::agentic_tool_use(step, envelope, services).await,
        ActionType::DirectToolCall { .. } => llm::direct_tool_call(step, envelope, services).await,
        ActionType::IntelligentRouter { .. } => llm::intelligent_router(step, envelope, services).await,
        ActionType::HttpRequest { .. } => http::http_request(step, envelope, services).await,
        ActionType::DatabaseSave { .. } => data::database_save(step, envelope, services).await,
        ActionType::DatabaseQuery { .. } => data::database_query(step, envelope, services).await,
        ActionType::VectorDbIngestion { .. } => vector::vector_db_ingestion(step, envelope, services).await,
        ActionType::VectorDbQuery { .. } => vector::vector_db_query(step, envelope, services).await,
        ActionType::CrossEncoderRerank { .. } => vector::cross_encoder_rerank(step, envelope, services).await,
        ActionType::StartLoop { .. } | ActionType::EndLoop { .. } | ActionType::WorkflowCall { .. } => {
            unreachable!("the driver loop special-cases this action kind before reaching dispatch")
        }
    }
}
