use std::sync::OnceLock;

use flowgraph_contracts::{ActionType, ExecutionEnvelope, Step, StepOutcome, ToolSelection};
use flowgraph_core::{resolve_json_template, resolve_string, ChatMessage, ChatRequest};
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use crate::services::Services;

pub async fn llm_response(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::LlmResponse { prompt_template, model_name } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let instruction = resolve_string(prompt_template, envelope);
    let history = serde_json::to_string(&envelope.step_history).unwrap_or_default();
    let prompt = format!(
        "{instruction}\n\nOriginal query: {}\n\nStep history so far:\n{history}",
        envelope.query
    );
    let model = model_name.clone().unwrap_or_else(|| services.default_model.clone());
    let request = ChatRequest::new(model, vec![ChatMessage::user(prompt)]).with_temperature(0.5);

    match services.llm.chat(request).await {
        Ok(response) => StepOutcome::Success { output: Some(Value::String(response.text)), next_step_override: None },
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}

fn final_answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<final_answer>\s*(true|false)\s*</final_answer>").unwrap())
}

pub async fn condition_check(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::ConditionCheck { prompt_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let condition = resolve_string(prompt_template, envelope);
    let state_json = json!({
        "query": envelope.query,
        "collected_inputs": envelope.collected_inputs,
        "step_history": envelope.step_history,
    });
    let prompt = format!(
        "Given the current workflow state:\n{}\n\nEvaluate this condition: {condition}\n\n\
         Respond with your reasoning in <reasoning></reasoning> tags, then your verdict in \
         <final_answer>TRUE</final_answer> or <final_answer>FALSE</final_answer>.",
        serde_json::to_string_pretty(&state_json).unwrap_or_default()
    );
    let request = ChatRequest::new(services.default_model.clone(), vec![ChatMessage::user(prompt)]).with_temperature(0.0);

    let response = match services.llm.chat(request).await {
        Ok(r) => r,
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };

    let is_true = if let Some(caps) = final_answer_re().captures(&response.text) {
        caps[1].eq_ignore_ascii_case("true")
    } else {
        warn!(step_id = %step.step_id, "condition_check: no <final_answer> tag, falling back to substring match");
        response.text.to_uppercase().contains("TRUE")
    };

    StepOutcome::Success { output: Some(Value::Bool(is_true)), next_step_override: None }
        .with_condition_result(is_true)
}

pub async fn agentic_tool_use(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::AgenticToolUse { prompt_template, tool_selection, tool_names } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let instruction = resolve_string(prompt_template, envelope);

    let (system, offered, require_tool) = match tool_selection {
        ToolSelection::Auto => (
            "You may use any of the available tools if one helps answer the request.".to_string(),
            services.tools.list(),
            true,
        ),
        ToolSelection::Manual => (
            "You must use one of the specifically provided tools to answer the request.".to_string(),
            services.tools.by_names(tool_names),
            true,
        ),
        ToolSelection::None => ("Respond directly; no tools are available for this request.".to_string(), Vec::new(), false),
    };

    let mut request = ChatRequest::new(
        services.default_model.clone(),
        vec![ChatMessage::system(system), ChatMessage::user(instruction)],
    );
    if !offered.is_empty() {
        request = request.with_tools(offered);
    }

    let response = match services.llm.chat(request).await {
        Ok(r) => r,
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };

    if let Some(call) = response.tool_calls.first() {
        return match services.tools.dispatch(&call.name, call.arguments.clone()).await {
            Ok(output) => StepOutcome::Success {
                output: Some(json!({"tool_name": call.name, "tool_args": call.arguments, "output": output})),
                next_step_override: None,
            },
            Err(e) => StepOutcome::Failure { error: e.to_string() },
        };
    }

    if require_tool {
        return StepOutcome::Failure { error: "Agent failed to select a required tool for this step".to_string() };
    }

    StepOutcome::Success { output: Some(Value::String(response.text)), next_step_override: None }
}

pub async fn direct_tool_call(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::DirectToolCall { target_tool_name, data_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let arguments = resolve_json_template(data_template, envelope);
    match services.tools.dispatch(target_tool_name, arguments).await {
        Ok(output) => StepOutcome::Success { output: Some(output), next_step_override: None },
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}

pub async fn intelligent_router(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::IntelligentRouter { prompt_template, routes } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let instruction = resolve_string(prompt_template, envelope);
    let labels: Vec<&String> = routes.keys().collect();
    let prompt = format!(
        "{instruction}\n\nChoose exactly one of the following route labels and reply with nothing else: {}",
        labels.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    );
    let request = ChatRequest::new(services.default_model.clone(), vec![ChatMessage::user(prompt)]).with_temperature(0.0);

    let response = match services.llm.chat(request).await {
        Ok(r) => r,
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };
    let chosen = response.text.trim().trim_matches(|c| c == '"' || c == '\'').to_string();

    match routes.get(&chosen) {
        Some(target) => StepOutcome::Success {
            output: Some(json!({"chosen_route": chosen, "next_step_id": target})),
            next_step_override: Some(target.clone()),
        },
        None => StepOutcome::Failure { error: format!("router chose an unknown route: '{chosen}'") },
    }
}

/// `condition_check` encodes its boolean result in the success flag itself so
/// the driver loop's generic success/failure routing becomes the condition's
/// true/false routing, without a separate branch construct.
trait ConditionResult {
    fn with_condition_result(self, is_true: bool) -> StepOutcome;
}

impl ConditionResult for StepOutcome {
    fn with_condition_result(self, is_true: bool) -> StepOutcome {
        if is_true {
            self
        } else if let StepOutcome::Success { output, .. } = self {
            StepOutcome::Failure { error: format!("condition evaluated to false (output: {:?})", output) }
        } else {
            self
        }
    }
}
