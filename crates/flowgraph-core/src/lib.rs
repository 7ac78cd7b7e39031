// Template evaluator, tool registry, provider traits, and graph loader shared
// by the storage, data, vector, and engine crates.
//
// Key design decisions:
// - Three template modes (string/json/sql) share one placeholder resolver
// - Providers (LLM, embedding, rerank) are traits so the engine's tests
//   never need a network call
// - The graph loader is the only place that understands the authoring
//   tool's node/edge shape; everything downstream works on typed `Step`s

pub mod error;
pub mod extractor;
pub mod graph_loader;
pub mod llm;
pub mod template;
pub mod tools;

pub use error::{CoreError, Result};
pub use extractor::{FileExtractor, PlainTextFileExtractor};
pub use graph_loader::load_workflow_from_graph;
pub use llm::{ChatMessage, ChatRequest, ChatResponse, ChatRole, EmbeddingProvider, LlmProvider, RerankProvider, RerankScore, ToolOffer};
pub use template::{resolve_json_template, resolve_json_template_str, resolve_placeholder, resolve_sql_mode, resolve_string, resolve_string_mode};
pub use tools::{Tool, ToolRegistry, ToolRegistryBuilder};
