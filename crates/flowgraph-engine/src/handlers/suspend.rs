use flowgraph_contracts::{ActionType, ExecutionEnvelope, PauseType, Step, StepOutcome};
use flowgraph_core::resolve_string;

pub fn human_input(step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
    let ActionType::HumanInput { prompt_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    StepOutcome::Suspend {
        pause_type: PauseType::AwaitingInput,
        prompt: resolve_string(prompt_template, envelope),
        output_key: step.output_key.clone().unwrap_or_default(),
        allowed_file_types: Vec::new(),
        max_files: None,
        storage_path: None,
    }
}

pub fn file_ingestion(step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
    let ActionType::FileIngestion { prompt_template, allowed_file_types, max_files } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    StepOutcome::Suspend {
        pause_type: PauseType::AwaitingFileUpload,
        prompt: resolve_string(prompt_template, envelope),
        output_key: step.output_key.clone().unwrap_or_default(),
        allowed_file_types: allowed_file_types.clone(),
        max_files: *max_files,
        storage_path: None,
    }
}

pub fn file_storage(step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
    let ActionType::FileStorage { prompt_template, allowed_file_types, max_files, storage_path } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    StepOutcome::Suspend {
        pause_type: PauseType::AwaitingFileUpload,
        prompt: resolve_string(prompt_template, envelope),
        output_key: step.output_key.clone().unwrap_or_default(),
        allowed_file_types: allowed_file_types.clone(),
        max_files: *max_files,
        storage_path: Some(storage_path.clone()),
    }
}

pub fn display_message(step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
    let ActionType::DisplayMessage { prompt_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let filled = resolve_string(prompt_template, envelope);
    StepOutcome::Success {
        output: Some(serde_json::Value::String(filled)),
        next_step_override: None,
    }
}
