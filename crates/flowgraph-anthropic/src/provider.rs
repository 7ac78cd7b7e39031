// Anthropic Messages API adapter. Anthropic has no embeddings endpoint, so
// this provider implements only `LlmProvider`.

use async_trait::async_trait;
use flowgraph_contracts::{ToolCall, ToolDefinition};
use flowgraph_core::{ChatMessage, ChatRequest, ChatResponse, ChatRole, CoreError, LlmProvider, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::AnthropicError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    messages_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            messages_url: MESSAGES_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| CoreError::llm(AnthropicError::MissingApiKey.to_string()))?;
        Ok(Self::new(api_key))
    }

    #[cfg(test)]
    fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self { client: Client::new(), api_key: api_key.into(), messages_url: format!("{base_url}/v1/messages") }
    }
}

fn tool_def_to_anthropic(def: &ToolDefinition) -> Value {
    json!({
        "name": def.name,
        "description": def.description,
        "input_schema": def.parameters_schema,
    })
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone());

        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m: &&ChatMessage| m.role != ChatRole::System)
            .map(|m| {
                let role = if m.role == ChatRole::Assistant { "assistant" } else { "user" };
                json!({"role": role, "content": m.content})
            })
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens.unwrap_or(1024),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if !request.tools.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.tools.iter().map(tool_def_to_anthropic).collect());
        }

        let response = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::llm(AnthropicError::Request(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::llm(AnthropicError::Api { status: status.as_u16(), body: text }.to_string()));
        }

        let payload: Value = response.json().await.map_err(|e| CoreError::llm(AnthropicError::Request(e).to_string()))?;
        let content = payload["content"]
            .as_array()
            .ok_or_else(|| CoreError::llm(AnthropicError::Shape("missing 'content' array".into()).to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in content {
            match block["type"].as_str() {
                Some("text") => text.push_str(block["text"].as_str().unwrap_or_default()),
                Some("tool_use") => {
                    tool_calls.push(ToolCall {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        arguments: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(ChatResponse { text, tool_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_core::ChatRequest;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_parses_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "hello there"}]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest::new("claude-3-5-sonnet-latest", vec![ChatMessage::user("hi")]);

        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.text, "hello there");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn chat_parses_tool_use_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "text", "text": "let me check that"},
                    {"type": "tool_use", "id": "toolu_1", "name": "check_known_outages", "input": {"service_name": "VPN Service"}}
                ]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest::new("claude-3-5-sonnet-latest", vec![ChatMessage::user("is the vpn down?")]);

        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.text, "let me check that");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "check_known_outages");
        assert_eq!(response.tool_calls[0].arguments["service_name"], "VPN Service");
    }

    #[tokio::test]
    async fn chat_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest::new("claude-3-5-sonnet-latest", vec![ChatMessage::user("hi")]);

        assert!(provider.chat(request).await.is_err());
    }

    #[tokio::test]
    async fn chat_splits_system_message_out_of_the_turn_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": [{"type": "text", "text": "ok"}]})))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest::new(
            "claude-3-5-sonnet-latest",
            vec![ChatMessage::system("be terse"), ChatMessage::user("hi")],
        );

        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.text, "ok");
    }
}
