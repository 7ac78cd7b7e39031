// Tool Registry
//
// The runtime consumes already-registered callables; tool discovery from
// source annotations is out of scope (there is no Rust equivalent to
// reflecting over a Python function's docstring). Registration is an
// explicit, compile-time act: each built-in tool implements `Tool` and is
// added to a `ToolRegistry` at process startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_contracts::ToolDefinition;
use serde_json::Value;

use crate::error::{CoreError, Result};

/// A single callable exposed to `agentic_tool_use` / `direct_tool_call` steps.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

/// Name -> tool lookup, built once at startup and shared read-only thereafter.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Definitions for a caller-supplied subset, in the order requested.
    pub fn by_names(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|n| self.tools.get(n).map(|t| t.definition()))
            .collect()
    }

    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::tool(format!("unknown tool '{name}'")))?;
        tool.execute(arguments).await
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry { tools: self.tools }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes its input back"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"value": {"type": "string"}}})
        }
        async fn execute(&self, arguments: Value) -> Result<Value> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn dispatches_registered_tool() {
        let registry = ToolRegistryBuilder::new().with_tool(Echo).build();
        let result = registry.dispatch("echo", json!({"value": "hi"})).await.unwrap();
        assert_eq!(result, json!({"value": "hi"}));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistryBuilder::new().build();
        assert!(registry.dispatch("missing", json!({})).await.is_err());
    }

    #[test]
    fn by_names_filters_and_preserves_order() {
        let registry = ToolRegistryBuilder::new().with_tool(Echo).build();
        let defs = registry.by_names(&["echo".to_string(), "nope".to_string()]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
