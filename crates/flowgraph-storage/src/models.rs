use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowgraph_contracts::{ExecutionEnvelope, Step, Workflow};
use serde_json::Value;

use crate::error::{Result, StoreError};

#[derive(sqlx::FromRow)]
pub struct WorkflowRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub triggers: Value,
    pub steps: Value,
    pub raw_definition: Value,
    pub start_step_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    pub fn into_workflow(self) -> Result<Workflow> {
        let triggers: Vec<String> = serde_json::from_value(self.triggers)?;
        let steps: HashMap<String, Step> = serde_json::from_value(self.steps)?;
        Ok(Workflow {
            id: self.id,
            name: self.name,
            description: self.description,
            owner: self.owner,
            triggers,
            start_step_id: self.start_step_id,
            steps,
            raw_definition: self.raw_definition,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct ExecutionStateRow {
    pub execution_id: String,
    pub workflow_id: i64,
    pub status: String,
    pub envelope: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionStateRow {
    pub fn into_envelope(self) -> Result<ExecutionEnvelope> {
        if self.status != "paused" {
            return Err(StoreError::execution_not_paused(&self.execution_id));
        }
        let envelope: ExecutionEnvelope = serde_json::from_value(self.envelope)?;
        Ok(envelope)
    }
}
