use flowgraph_contracts::{ActionType, ExecutionEnvelope, Step, StepOutcome};
use flowgraph_core::{resolve_json_template, resolve_sql_mode};
use serde_json::Value;

use crate::services::Services;

pub async fn database_save(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::DatabaseSave { table_name, data_template, primary_key_columns } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let data = resolve_json_template(data_template, envelope);
    match services.data.upsert(table_name, &data, primary_key_columns).await {
        Ok(()) => StepOutcome::Success {
            output: Some(Value::String(format!("Successfully saved to '{table_name}'"))),
            next_step_override: None,
        },
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}

pub async fn database_query(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::DatabaseQuery { query_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let (sql, params) = resolve_sql_mode(query_template, envelope);
    match services.data.query(&sql, &params).await {
        Ok(rows) => StepOutcome::Success { output: Some(Value::Array(rows)), next_step_override: None },
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}
