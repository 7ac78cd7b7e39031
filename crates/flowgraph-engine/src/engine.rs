use flowgraph_contracts::{ActionType, ExecutionEnvelope, HistoryEntry, PauseType, Step, StepOutcome, Workflow};
use flowgraph_core::{resolve_json_template, ChatMessage, ChatRequest};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::handlers;
use crate::services::Services;

/// What a driver loop run produced, returned to the HTTP layer or to the
/// parent step of a `workflow_call`.
#[derive(Debug, Clone)]
pub enum EngineResult {
    Completed { envelope: ExecutionEnvelope },
    Suspended { envelope: ExecutionEnvelope, pause_type: PauseType, prompt: String },
    Failed { envelope: ExecutionEnvelope, error: String },
}

#[derive(Clone)]
pub struct Engine {
    pub services: Services,
}

struct LoopState {
    collection: Vec<Value>,
    index: usize,
    results: Vec<Value>,
}

impl LoopState {
    fn sentinel_key(step_id: &str) -> String {
        format!("__loop_state_{step_id}")
    }

    fn load(envelope: &ExecutionEnvelope, step_id: &str) -> Option<Self> {
        let raw = envelope.collected_inputs.get(&Self::sentinel_key(step_id))?;
        let collection = raw.get("collection")?.as_array()?.clone();
        let index = raw.get("index")?.as_u64()? as usize;
        let results = raw.get("results")?.as_array()?.clone();
        Some(Self { collection, index, results })
    }

    fn store(&self, envelope: &mut ExecutionEnvelope, step_id: &str) {
        envelope.collected_inputs.insert(
            Self::sentinel_key(step_id),
            json!({"collection": self.collection, "index": self.index, "results": self.results}),
        );
    }

    fn clear(envelope: &mut ExecutionEnvelope, step_id: &str) {
        envelope.collected_inputs.remove(&Self::sentinel_key(step_id));
    }
}

impl Engine {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Resolves a workflow by name against the query via the LLM, then starts it.
    pub async fn start_by_query(&self, query: String, initial_context: Value) -> Result<EngineResult> {
        let workflows = self.services.storage.list_workflows().await?;
        if workflows.is_empty() {
            return Err(EngineError::NoMatchingWorkflow);
        }
        let catalogue = workflows
            .iter()
            .map(|w| format!("- \"{}\": {} (triggers: {})", w.name, w.description, w.triggers.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Given the following available workflows:\n{catalogue}\n\nWhich workflow name best matches this request?\n\
             Reply with the workflow name only: {query}"
        );
        let request = ChatRequest::new(self.services.default_model.clone(), vec![ChatMessage::user(prompt)]).with_temperature(0.0);
        let response = self.services.llm.chat(request).await?;
        let chosen = response.text.trim().trim_matches(|c| c == '"' || c == '\'').to_string();

        let workflow = workflows
            .iter()
            .find(|w| w.name == chosen)
            .ok_or(EngineError::NoMatchingWorkflow)?;
        let workflow = self.services.storage.get_workflow(workflow.id).await?;
        self.start(&workflow, query, initial_context).await
    }

    pub async fn start_by_id(&self, workflow_id: i64, query: String, initial_context: Value) -> Result<EngineResult> {
        let workflow = self.services.storage.get_workflow(workflow_id).await?;
        self.start(&workflow, query, initial_context).await
    }

    async fn start(&self, workflow: &Workflow, query: String, initial_context: Value) -> Result<EngineResult> {
        let execution_id = Uuid::now_v7().to_string();
        let envelope = ExecutionEnvelope::new(execution_id, workflow.id, query, initial_context, workflow.start_step_id.clone());
        self.run(workflow, envelope, Vec::new()).await
    }

    pub async fn resume(&self, execution_id: &str, value: Value) -> Result<EngineResult> {
        let mut envelope = self.services.storage.get_paused_execution(execution_id).await?;
        let workflow = self.services.storage.get_workflow(envelope.workflow_id).await?;
        let step = workflow
            .steps
            .get(&envelope.current_step_id)
            .ok_or_else(|| EngineError::step_not_found(&envelope.current_step_id))?;

        if let Some(output_key) = &step.output_key {
            envelope.collected_inputs.insert(output_key.clone(), value);
        }
        envelope.step_history.push(HistoryEntry::success(step.step_id.clone(), "human_input_provided", Value::Null));
        envelope.current_step_id = step.on_success.clone();

        self.run(&workflow, envelope, Vec::new()).await
    }

    /// The driver loop. Boxed because `workflow_call` recurses into this
    /// same method for a child execution.
    fn run<'a>(&'a self, workflow: &'a Workflow, mut envelope: ExecutionEnvelope, mut loop_stack: Vec<String>) -> BoxFuture<'a, Result<EngineResult>> {
        async move {
            loop {
                if envelope.current_step_id == flowgraph_contracts::END {
                    return self.finalize(envelope).await;
                }

                let step = workflow
                    .steps
                    .get(&envelope.current_step_id)
                    .ok_or_else(|| EngineError::step_not_found(&envelope.current_step_id))?
                    .clone();

                let outcome = match &step.action {
                    ActionType::StartLoop { .. } => self.enter_loop(&step, &mut envelope)?,
                    ActionType::EndLoop { .. } => self.exit_loop_iteration(&step, &envelope),
                    ActionType::WorkflowCall { .. } => self.call_sub_workflow(&step, &envelope).await,
                    _ => handlers::dispatch(&step, &envelope, &self.services).await,
                };

                match outcome {
                    StepOutcome::Suspend { pause_type, prompt, output_key, allowed_file_types, max_files, storage_path } => {
                        envelope.current_step_id = step.step_id.clone();
                        envelope.step_history.push(HistoryEntry::success(
                            step.step_id.clone(),
                            step.action.kind(),
                            json!({"paused": true, "prompt": prompt, "output_key": output_key, "allowed_file_types": allowed_file_types, "max_files": max_files, "storage_path": storage_path}),
                        ));
                        self.services.storage.save_execution_state(&envelope, "paused").await?;
                        info!(execution_id = %envelope.execution_id, step_id = %step.step_id, "execution suspended");
                        return Ok(EngineResult::Suspended { envelope, pause_type, prompt });
                    }
                    StepOutcome::Success { output, next_step_override } => {
                        if let (Some(key), Some(value)) = (&step.output_key, &output) {
                            envelope.collected_inputs.insert(key.clone(), value.clone());
                        }
                        let next = next_step_override.unwrap_or(step.on_success.clone());
                        if next == flowgraph_contracts::END && step.action.kind() == "llm_response" {
                            if let Some(Value::String(text)) = &output {
                                envelope.final_response = Some(text.clone());
                            }
                        }
                        envelope.step_history.push(HistoryEntry::success(step.step_id.clone(), step.action.kind(), output.unwrap_or(Value::Null)));
                        envelope.current_step_id = next;
                    }
                    StepOutcome::Failure { error } => {
                        envelope.step_history.push(HistoryEntry::failure(step.step_id.clone(), step.action.kind(), error.clone()));
                        match &step.on_failure {
                            Some(next) => envelope.current_step_id = next.clone(),
                            None => {
                                warn!(execution_id = %envelope.execution_id, step_id = %step.step_id, error = %error, "execution failed");
                                self.services.storage.delete_execution_state(&envelope.execution_id).await?;
                                return Ok(EngineResult::Failed { envelope, error });
                            }
                        }
                    }
                    StepOutcome::EnterLoopBody { next_step } => {
                        loop_stack.push(step.step_id.clone());
                        envelope.current_step_id = next_step;
                    }
                    StepOutcome::LoopIterationComplete { output } => {
                        let owner = loop_stack.pop().ok_or_else(|| EngineError::loop_misuse("end_loop without an owning start_loop"))?;
                        envelope.step_history.push(HistoryEntry::success(step.step_id.clone(), step.action.kind(), output));
                        envelope.current_step_id = owner;
                    }
                }
            }
        }
        .boxed()
    }

    #[instrument(skip(self, envelope))]
    fn enter_loop(&self, step: &Step, envelope: &mut ExecutionEnvelope) -> Result<StepOutcome> {
        let ActionType::StartLoop { input_collection_variable, current_item_output_key, loop_body_start_step_id } = &step.action else {
            unreachable!("dispatch guarantees the matching variant");
        };

        let mut state = match LoopState::load(envelope, &step.step_id) {
            Some(state) => state,
            None => {
                let resolved = flowgraph_core::resolve_string_mode(input_collection_variable, envelope);
                let collection = match resolved {
                    Value::Array(items) => items,
                    _ => return Err(EngineError::loop_misuse(format!("'{input_collection_variable}' is not a list"))),
                };
                LoopState { collection, index: 0, results: Vec::new() }
            }
        };

        // Aggregate the previous iteration's output, if this is a re-entry.
        if let Some(last) = envelope.step_history.last() {
            if last.action_type == "end_loop" && last.success {
                if let Some(output) = &last.output {
                    state.results.push(output.clone());
                }
            }
        }

        if state.index >= state.collection.len() {
            let results = state.results.clone();
            LoopState::clear(envelope, &step.step_id);
            return Ok(StepOutcome::Success { output: Some(Value::Array(results)), next_step_override: None });
        }

        let current_item = state.collection[state.index].clone();
        envelope.collected_inputs.insert(current_item_output_key.clone(), current_item);
        state.index += 1;
        state.store(envelope, &step.step_id);

        Ok(StepOutcome::EnterLoopBody { next_step: loop_body_start_step_id.clone() })
    }

    fn exit_loop_iteration(&self, step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
        let ActionType::EndLoop { value_to_return } = &step.action else {
            unreachable!("dispatch guarantees the matching variant");
        };
        let output = match value_to_return {
            Some(template) => flowgraph_core::resolve_string_mode(template, envelope),
            None => envelope.step_history.last().and_then(|h| h.output.clone()).unwrap_or(Value::Null),
        };
        StepOutcome::LoopIterationComplete { output }
    }

    async fn call_sub_workflow(&self, step: &Step, envelope: &ExecutionEnvelope) -> StepOutcome {
        let ActionType::WorkflowCall { target_workflow_id, input_mappings } = &step.action else {
            unreachable!("dispatch guarantees the matching variant");
        };

        let child_workflow = match self.services.storage.get_workflow(*target_workflow_id).await {
            Ok(w) => w,
            Err(e) => return StepOutcome::Failure { error: e.to_string() },
        };

        let mapped = resolve_json_template(input_mappings, envelope);
        let child_query = mapped.get("query").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| envelope.query.clone());

        let mut child_context = match mapped {
            Value::Object(map) => Value::Object(map),
            other => other,
        };
        if let Value::Object(map) = &mut child_context {
            map.insert("parent_query".to_string(), Value::String(envelope.query.clone()));
            map.insert("parent_execution_id".to_string(), Value::String(envelope.execution_id.clone()));
        }

        let child_envelope = ExecutionEnvelope::new(
            Uuid::now_v7().to_string(),
            child_workflow.id,
            child_query,
            child_context,
            child_workflow.start_step_id.clone(),
        );

        match self.run(&child_workflow, child_envelope, Vec::new()).await {
            Ok(EngineResult::Completed { envelope: child }) => StepOutcome::Success {
                output: Some(Value::String(child.final_response.unwrap_or_default())),
                next_step_override: None,
            },
            Ok(EngineResult::Suspended { .. }) => {
                StepOutcome::Failure { error: "sub-workflow suspended; sub-workflows must be non-interactive".to_string() }
            }
            Ok(EngineResult::Failed { error, .. }) => StepOutcome::Failure { error },
            Err(e) => StepOutcome::Failure { error: e.to_string() },
        }
    }

    async fn finalize(&self, mut envelope: ExecutionEnvelope) -> Result<EngineResult> {
        if envelope.final_response.is_none() {
            let history = serde_json::to_string(&envelope.step_history).unwrap_or_default();
            let prompt = format!(
                "Summarize the outcome of this workflow execution for the user in one or two sentences.\n\
                 Original query: {}\n\nStep history:\n{history}",
                envelope.query
            );
            let request = ChatRequest::new(self.services.default_model.clone(), vec![ChatMessage::user(prompt)]).with_temperature(0.5);
            match self.services.llm.chat(request).await {
                Ok(response) => envelope.final_response = Some(response.text),
                Err(e) => {
                    warn!(execution_id = %envelope.execution_id, error = %e, "failed to synthesize final response");
                    envelope.final_response = Some(String::new());
                }
            }
        }
        self.services.storage.delete_execution_state(&envelope.execution_id).await?;
        info!(execution_id = %envelope.execution_id, "execution completed");
        Ok(EngineResult::Completed { envelope })
    }
}
