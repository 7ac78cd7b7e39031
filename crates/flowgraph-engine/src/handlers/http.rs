use flowgraph_contracts::{ActionType, ExecutionEnvelope, Step, StepOutcome};
use flowgraph_core::{resolve_json_template, resolve_string};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::warn;

use crate::retry::is_retryable_status;
use crate::services::Services;

pub async fn http_request(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::HttpRequest { http_method, url_template, headers_template, body_template } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };

    let url = resolve_string(url_template, envelope);
    let method = match http_method.to_uppercase().parse::<Method>() {
        Ok(m) => m,
        Err(_) => return StepOutcome::Failure { error: format!("invalid HTTP method '{http_method}'") },
    };

    let headers = resolve_json_template(headers_template, envelope);
    let mut header_map = match &headers {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };

    let body = if body_template.is_null() { None } else { Some(resolve_json_template(body_template, envelope)) };
    if body.is_some() && !header_map.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        header_map.insert("content-type".to_string(), json!("application/json"));
    }

    let policy = &services.http_retry;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let mut request = services.http.request(method.clone(), &url);
        for (key, value) in &header_map {
            if let Some(v) = value.as_str() {
                request = request.header(key, v);
            }
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if (200..300).contains(&status) {
                    let response_headers: serde_json::Map<String, Value> = response
                        .headers()
                        .iter()
                        .map(|(name, value)| (name.to_string(), json!(value.to_str().unwrap_or_default())))
                        .collect();
                    let text = response.text().await.unwrap_or_default();
                    let parsed_body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
                    return StepOutcome::Success {
                        output: Some(json!({"status_code": status, "headers": response_headers, "body": parsed_body})),
                        next_step_override: None,
                    };
                }
                if is_retryable_status(status) && policy.has_attempts_remaining(attempt) {
                    warn!(step_id = %step.step_id, status, attempt, "http_request: retrying after server error");
                    tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                    continue;
                }
                let text = response.text().await.unwrap_or_default();
                return StepOutcome::Failure { error: format!("HTTP {status}: {text}") };
            }
            Err(e) => {
                if policy.has_attempts_remaining(attempt) {
                    warn!(step_id = %step.step_id, error = %e, attempt, "http_request: retrying after transport error");
                    tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                    continue;
                }
                return StepOutcome::Failure { error: e.to_string() };
            }
        }
    }
}
