use flowgraph_contracts::{ExecutionEnvelope, Workflow, WorkflowSummary};
use sqlx::PgPool;

use crate::error::{Result, StoreError};
use crate::models::{ExecutionStateRow, WorkflowRow};

/// Durable store for workflow definitions and paused execution envelopes.
///
/// Workflows are upserted by name; execution states are inserted-or-updated
/// by `execution_id` and only ever returned while `status = 'paused'`.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a new workflow, or update the existing row sharing its name.
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<Workflow> {
        let triggers = serde_json::to_value(&workflow.triggers)?;
        let steps = serde_json::to_value(&workflow.steps)?;

        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            INSERT INTO workflows (name, description, owner, triggers, steps, raw_definition, start_step_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO UPDATE SET
                description = EXCLUDED.description,
                owner = EXCLUDED.owner,
                triggers = EXCLUDED.triggers,
                steps = EXCLUDED.steps,
                raw_definition = EXCLUDED.raw_definition,
                start_step_id = EXCLUDED.start_step_id,
                updated_at = now()
            RETURNING id, name, description, owner, triggers, steps, raw_definition, start_step_id, created_at, updated_at
            "#,
        )
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.owner)
        .bind(&triggers)
        .bind(&steps)
        .bind(&workflow.raw_definition)
        .bind(&workflow.start_step_id)
        .fetch_one(&self.pool)
        .await?;

        row.into_workflow()
    }

    pub async fn get_workflow(&self, id: i64) -> Result<Workflow> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, description, owner, triggers, steps, raw_definition, start_step_id, created_at, updated_at
            FROM workflows WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::workflow_not_found(id))?;

        row.into_workflow()
    }

    pub async fn get_workflow_by_name(&self, name: &str) -> Result<Workflow> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, description, owner, triggers, steps, raw_definition, start_step_id, created_at, updated_at
            FROM workflows WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::workflow_not_found(name))?;

        row.into_workflow()
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let rows = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, description, owner, triggers, steps, raw_definition, start_step_id, created_at, updated_at
            FROM workflows ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_workflow().map(|w| (&w).into())).collect()
    }

    /// Cascades to every paused `execution_states` row for this workflow.
    pub async fn delete_workflow(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1").bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::workflow_not_found(id));
        }
        Ok(())
    }

    pub async fn save_execution_state(&self, envelope: &ExecutionEnvelope, status: &str) -> Result<()> {
        let envelope_json = serde_json::to_value(envelope)?;
        sqlx::query(
            r#"
            INSERT INTO execution_states (execution_id, workflow_id, status, envelope)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (execution_id) DO UPDATE SET
                status = EXCLUDED.status,
                envelope = EXCLUDED.envelope,
                updated_at = now()
            "#,
        )
        .bind(&envelope.execution_id)
        .bind(envelope.workflow_id)
        .bind(status)
        .bind(&envelope_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Only returns a row whose `status = 'paused'`; anything else is treated
    /// as not found, matching the durability contract for resumption.
    pub async fn get_paused_execution(&self, execution_id: &str) -> Result<ExecutionEnvelope> {
        let row = sqlx::query_as::<_, ExecutionStateRow>(
            r#"
            SELECT execution_id, workflow_id, status, envelope, created_at, updated_at
            FROM execution_states WHERE execution_id = $1 AND status = 'paused'
            "#,
        )
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::execution_not_paused(execution_id))?;

        row.into_envelope()
    }

    pub async fn delete_execution_state(&self, execution_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM execution_states WHERE execution_id = $1")
            .bind(execution_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
