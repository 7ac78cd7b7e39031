// OpenAI chat-completions and embeddings adapter.

use async_trait::async_trait;
use flowgraph_contracts::{ToolCall, ToolDefinition};
use flowgraph_core::{ChatMessage, ChatRequest, ChatResponse, ChatRole, CoreError, EmbeddingProvider, LlmProvider, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::OpenAiError;

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    chat_url: String,
    embeddings_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            chat_url: CHAT_URL.to_string(),
            embeddings_url: EMBEDDINGS_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| CoreError::llm(OpenAiError::MissingApiKey.to_string()))?;
        Ok(Self::new(api_key))
    }

    #[cfg(test)]
    fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            chat_url: format!("{base_url}/v1/chat/completions"),
            embeddings_url: format!("{base_url}/v1/embeddings"),
        }
    }

    fn role_str(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

fn tool_def_to_openai(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters_schema,
        }
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m: &ChatMessage| json!({"role": Self::role_str(m.role), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if !request.tools.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.tools.iter().map(tool_def_to_openai).collect());
            if request.tools.force_tool_choice {
                body["tool_choice"] = json!("auto");
            }
        }

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::llm(OpenAiError::Request(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::llm(OpenAiError::Api { status: status.as_u16(), body: text }.to_string()));
        }

        let payload: Value = response.json().await.map_err(|e| CoreError::llm(OpenAiError::Request(e).to_string()))?;
        let choice = payload["choices"][0]["message"].clone();
        let text = choice["content"].as_str().unwrap_or_default().to_string();

        let tool_calls = choice["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        let id = c["id"].as_str()?.to_string();
                        let name = c["function"]["name"].as_str()?.to_string();
                        let raw_args = c["function"]["arguments"].as_str().unwrap_or("{}");
                        let arguments: Value = serde_json::from_str(raw_args).unwrap_or(Value::Object(Default::default()));
                        Some(ToolCall { id, name, arguments })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChatResponse { text, tool_calls })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({"model": model, "input": inputs});
        let response = self
            .client
            .post(&self.embeddings_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::llm(OpenAiError::Request(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::llm(OpenAiError::Api { status: status.as_u16(), body: text }.to_string()));
        }

        let payload: Value = response.json().await.map_err(|e| CoreError::llm(OpenAiError::Request(e).to_string()))?;
        let data = payload["data"]
            .as_array()
            .ok_or_else(|| CoreError::llm(OpenAiError::Shape("missing 'data' array".into()).to_string()))?;

        data.iter()
            .map(|entry| {
                entry["embedding"]
                    .as_array()
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .ok_or_else(|| CoreError::llm(OpenAiError::Shape("missing 'embedding' array".into()).to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_core::{ChatRequest, ChatRole, ToolOffer};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_parses_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello there"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage { role: ChatRole::User, content: "hi".into() }],
            temperature: 0.0,
            max_tokens: None,
            tools: ToolOffer::default(),
        };

        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.text, "hello there");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn chat_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "call_1", "function": {"name": "create_ticket", "arguments": "{\"summary\":\"x\"}"}}]
                }}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage { role: ChatRole::User, content: "hi".into() }],
            temperature: 0.0,
            max_tokens: None,
            tools: ToolOffer::default(),
        };

        let response = provider.chat(request).await.unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "create_ticket");
    }

    #[tokio::test]
    async fn chat_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_base_url("test-key", &server.uri());
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage { role: ChatRole::User, content: "hi".into() }],
            temperature: 0.0,
            max_tokens: None,
            tools: ToolOffer::default(),
        };

        assert!(provider.chat(request).await.is_err());
    }

    #[tokio::test]
    async fn embed_parses_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_base_url("test-key", &server.uri());
        let vectors = provider.embed("text-embedding-3-small", &["hello".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]]);
    }
}
