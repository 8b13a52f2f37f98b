//! Task API boundary.
//!
//! Thin policy layer in front of the escalation engine. Tenant governance
//! (required resolution notes/proof, reassignment policy) is enforced here
//! and only here, so internal callers and background jobs can still mutate
//! tasks unconditionally through the engine.

use crate::error::{PipelineError, PipelineResult};
use crate::escalation::task::{Task, TaskFilter};
use crate::escalation::EscalationEngine;
use crate::model::TaskGovernance;
use crate::store::{TaskStore, TenantDirectory};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub struct TaskApi {
    tenants: Arc<dyn TenantDirectory>,
    tasks: Arc<dyn TaskStore>,
    engine: Arc<EscalationEngine>,
}

impl TaskApi {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        tasks: Arc<dyn TaskStore>,
        engine: Arc<EscalationEngine>,
    ) -> Self {
        Self {
            tenants,
            tasks,
            engine,
        }
    }

    /// Resolve a task on behalf of `actor`, subject to tenant governance.
    pub async fn resolve_task(
        &self,
        tenant_id: Uuid,
        task_id: Uuid,
        actor: &str,
        note: Option<String>,
        proof_url: Option<String>,
    ) -> PipelineResult<Task> {
        let governance = self.governance(tenant_id).await?;
        self.authorize_task(tenant_id, task_id).await?;

        if governance.require_resolution_note
            && note.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            warn!(%tenant_id, %task_id, "resolution rejected: note required");
            return Err(PipelineError::policy("resolution note is required"));
        }
        if governance.require_resolution_proof && proof_url.is_none() {
            warn!(%tenant_id, %task_id, "resolution rejected: proof required");
            return Err(PipelineError::policy("resolution proof is required"));
        }

        self.engine.resolve_task(task_id, actor, note, proof_url).await
    }

    /// Reassign a task on behalf of `actor`, subject to tenant governance.
    pub async fn reassign_task(
        &self,
        tenant_id: Uuid,
        task_id: Uuid,
        new_assignee: &str,
        actor: &str,
        due_date: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> PipelineResult<Task> {
        let governance = self.governance(tenant_id).await?;
        self.authorize_task(tenant_id, task_id).await?;

        if !governance.allow_reassignment {
            warn!(%tenant_id, %task_id, "reassignment rejected by tenant policy");
            return Err(PipelineError::policy(
                "reassignment is disabled for this tenant",
            ));
        }

        self.engine
            .reassign_task(task_id, new_assignee, actor, due_date, reason)
            .await
    }

    /// Filtered task listing, most urgent first.
    pub async fn list_tasks(
        &self,
        tenant_id: Uuid,
        filter: &TaskFilter,
    ) -> PipelineResult<Vec<Task>> {
        // Listing is not policy-gated, but the tenant must exist.
        self.governance(tenant_id).await?;
        self.engine.get_tasks(tenant_id, filter).await
    }

    async fn governance(&self, tenant_id: Uuid) -> PipelineResult<TaskGovernance> {
        let tenant = self
            .tenants
            .get_tenant(tenant_id)
            .await?
            .ok_or(PipelineError::TenantNotFound { tenant_id })?;
        Ok(tenant.settings.task_config)
    }

    /// Cross-tenant access is indistinguishable from a missing task.
    async fn authorize_task(&self, tenant_id: Uuid, task_id: Uuid) -> PipelineResult<()> {
        match self.tasks.get_task(task_id).await? {
            Some(task) if task.tenant_id == tenant_id => Ok(()),
            _ => Err(PipelineError::TaskNotFound { task_id }),
        }
    }
}
