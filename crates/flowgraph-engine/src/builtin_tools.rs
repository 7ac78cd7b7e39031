// A small fixed set of built-in tools registered at process startup. Tool
// authoring and schema generation from source annotations is out of scope;
// each tool below hand-writes its own name, schema, and behavior.

use async_trait::async_trait;
use flowgraph_core::{CoreError, Result, Tool};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};

/// Looks up whether a named service has a known outage. Backed by a fixed
/// table rather than a real status-page integration, since no such
/// dependency exists in this workspace.
pub struct CheckKnownOutagesTool {
    known_outages: Vec<String>,
}

impl CheckKnownOutagesTool {
    pub fn new(known_outages: Vec<String>) -> Self {
        Self { known_outages }
    }
}

impl Default for CheckKnownOutagesTool {
    fn default() -> Self {
        Self::new(vec!["VPN Service".to_string()])
    }
}

#[async_trait]
impl Tool for CheckKnownOutagesTool {
    fn name(&self) -> &str {
        "check_known_outages"
    }

    fn description(&self) -> &str {
        "Checks whether a named service currently has a known outage."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"service_name": {"type": "string"}},
            "required": ["service_name"],
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value> {
        let service_name = arguments
            .get("service_name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::tool("check_known_outages requires a 'service_name' argument"))?;

        if self.known_outages.iter().any(|s| s.eq_ignore_ascii_case(service_name)) {
            Ok(json!({"service_name": service_name, "status": "outage"}))
        } else {
            Ok(json!({"service_name": service_name, "status": "operational"}))
        }
    }
}

/// Creates an `IT-####` ticket id. Numbering is an in-memory counter rather
/// than a real ticketing-system integration.
pub struct CreateTicketTool {
    next_id: AtomicU32,
}

impl CreateTicketTool {
    pub fn new() -> Self {
        Self { next_id: AtomicU32::new(1000) }
    }
}

impl Default for CreateTicketTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CreateTicketTool {
    fn name(&self) -> &str {
        "create_ticket"
    }

    fn description(&self) -> &str {
        "Opens a support ticket and returns its id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "category": {"type": "string"},
                "requester": {"type": "string"},
            },
            "required": ["summary"],
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value> {
        let summary = arguments
            .get("summary")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::tool("create_ticket requires a 'summary' argument"))?;
        let ticket_id = format!("IT-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(json!({
            "ticket_id": ticket_id,
            "summary": summary,
            "category": arguments.get("category").cloned().unwrap_or(Value::Null),
            "requester": arguments.get("requester").cloned().unwrap_or(Value::Null),
        }))
    }
}
