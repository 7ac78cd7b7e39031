use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::step::Step;

/// A directed graph of steps plus the metadata needed to locate and route to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner: String,
    /// Natural-language phrases used by the router to match a user query to this workflow.
    pub triggers: Vec<String>,
    pub start_step_id: String,
    pub steps: HashMap<String, Step>,
    /// The authoring-tool graph (`{nodes, edges}`), preserved verbatim for lossless round-trip.
    pub raw_definition: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Every edge target named by a step must be `END` or an existing step id.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("workflow name must not be empty".into());
        }
        if self.start_step_id != crate::END && !self.steps.contains_key(&self.start_step_id) {
            return Err(format!("start_step_id '{}' is not a known step", self.start_step_id));
        }
        for step in self.steps.values() {
            for target in step.targets() {
                if target != crate::END && !self.steps.contains_key(&target) {
                    return Err(format!(
                        "step '{}' targets unknown step '{}'",
                        step.step_id, target
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Lightweight projection of a [`Workflow`] for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct WorkflowSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub triggers: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(w: &Workflow) -> Self {
        WorkflowSummary {
            id: w.id,
            name: w.name.clone(),
            description: w.description.clone(),
            owner: w.owner.clone(),
            triggers: w.triggers.clone(),
            updated_at: w.updated_at,
        }
    }
}
