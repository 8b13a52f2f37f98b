//! Escalation engine — turns negative feedback into tracked remediation work.
//!
//! Owns task creation (assignment, priority, SLA), resolution, reassignment
//! and queries. Governance (required notes/proof, reassignment policy) is
//! deliberately NOT enforced here: the engine's mutation contract is
//! unconditional, and the calling boundary ([`crate::api::TaskApi`]) checks
//! tenant policy before invoking it.

use crate::error::{PipelineError, PipelineResult};
use crate::escalation::task::{
    is_legal_transition, AssignmentRecord, HistoryAction, HistoryEntry, Task, TaskFilter,
    TaskPriority, TaskStatus, SYSTEM_ACTOR,
};
use crate::model::{Response, Tenant};
use crate::notify::Dispatcher;
use crate::store::{StoreDirectory, TaskStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// NPS at or below this opens a task.
const NPS_TASK_THRESHOLD: i32 = 6;
/// CSAT at or below this opens a task.
const CSAT_TASK_THRESHOLD: i32 = 2;
/// NPS at or below this makes the task high priority.
const NPS_HIGH_PRIORITY: i32 = 3;
/// CSAT at or below this makes the task high priority.
const CSAT_HIGH_PRIORITY: i32 = 1;
/// Every task must be acted on within this window, regardless of priority.
const SLA_WINDOW_HOURS: i64 = 24;

pub struct EscalationEngine {
    tasks: Arc<dyn TaskStore>,
    stores: Arc<dyn StoreDirectory>,
    dispatcher: Dispatcher,
}

impl EscalationEngine {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        stores: Arc<dyn StoreDirectory>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            tasks,
            stores,
            dispatcher,
        }
    }

    /// Open a remediation task if the response breaches the score thresholds.
    ///
    /// A task is created only when `nps <= 6` or `csat <= 2`; a missing score
    /// defaults to the non-triggering extreme (NPS 10, CSAT 5) so a form
    /// without the relevant question never spuriously escalates. Internal
    /// failures are logged and swallowed — a failure to escalate must never
    /// fail the originating submission.
    pub async fn check_and_create_task(
        &self,
        response: &Response,
        tenant: &Tenant,
    ) -> Option<Task> {
        let nps = response.metrics.nps_score.unwrap_or(10);
        let csat = response.metrics.csat_score.unwrap_or(5);

        if nps > NPS_TASK_THRESHOLD && csat > CSAT_TASK_THRESHOLD {
            return None;
        }

        info!(
            tenant_id = %tenant.id,
            response_id = %response.id,
            nps,
            csat,
            "negative feedback detected, opening task"
        );

        match self.create_task(response, tenant, nps, csat).await {
            Ok(task) => Some(task),
            Err(err) => {
                error!(
                    tenant_id = %tenant.id,
                    response_id = %response.id,
                    error = %err,
                    "failed to create task"
                );
                None
            }
        }
    }

    async fn create_task(
        &self,
        response: &Response,
        tenant: &Tenant,
        nps: i32,
        csat: i32,
    ) -> PipelineResult<Task> {
        // Assign to the store manager when the response carries a resolvable
        // location, otherwise to the tenant owner.
        let mut location_id = None;
        let mut location_name = None;
        let mut assigned_to = tenant.owner_email.clone();

        if let Some(store_id) = response.customer.store_id {
            if let Some(store) = self.stores.find_store(store_id).await? {
                location_id = Some(store.id);
                if let Some(manager) = store.manager_email {
                    assigned_to = manager;
                }
                location_name = Some(store.name);
            }
        }

        let priority = if nps <= NPS_HIGH_PRIORITY || csat <= CSAT_HIGH_PRIORITY {
            TaskPriority::High
        } else {
            TaskPriority::Medium
        };

        let created_at = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            location_id,
            response_id: response.id,
            status: TaskStatus::Open,
            priority,
            assigned_to: assigned_to.clone(),
            assignment_history: vec![],
            resolution_note: None,
            resolution_proof_url: None,
            history: vec![HistoryEntry::new(
                HistoryAction::Created,
                SYSTEM_ACTOR,
                Some(format!("Auto-generated from feedback. NPS: {nps}, CSAT: {csat}")),
            )],
            sla_breach_at: created_at + Duration::hours(SLA_WINDOW_HOURS),
            due_date: None,
            created_at,
        };

        self.tasks.insert_task(task.clone()).await?;
        info!(task_id = %task.id, assigned_to = %assigned_to, priority = %task.priority, "task created");

        // Fire-and-forget: a dispatch failure must not roll back creation.
        let dispatcher = self.dispatcher.clone();
        let tenant = tenant.clone();
        let task_for_alert = task.clone();
        tokio::spawn(async move {
            dispatcher
                .send_task_alert(
                    &tenant,
                    &task_for_alert,
                    &task_for_alert.assigned_to,
                    location_name.as_deref(),
                )
                .await;
        });

        Ok(task)
    }

    /// Mark a task resolved. Unconditional: governance gating happens at the
    /// calling boundary.
    pub async fn resolve_task(
        &self,
        task_id: Uuid,
        actor: &str,
        note: Option<String>,
        proof_url: Option<String>,
    ) -> PipelineResult<Task> {
        let actor = actor.to_string();
        let updated = self
            .tasks
            .update_task(
                task_id,
                Box::new(move |task| {
                    if !is_legal_transition(task.status, TaskStatus::Resolved) {
                        warn!(
                            task_id = %task.id,
                            status = %task.status,
                            "resolve outside the active lifecycle"
                        );
                    }

                    let history_note = note
                        .clone()
                        .unwrap_or_else(|| "Marked as resolved".to_string());
                    task.status = TaskStatus::Resolved;
                    if note.is_some() {
                        task.resolution_note = note;
                    }
                    if proof_url.is_some() {
                        task.resolution_proof_url = proof_url;
                    }
                    task.history.push(HistoryEntry::new(
                        HistoryAction::Resolved,
                        actor,
                        Some(history_note),
                    ));
                }),
            )
            .await?;

        updated.ok_or(PipelineError::TaskNotFound { task_id })
    }

    /// Transfer a task to a new assignee.
    ///
    /// Records the previous assignee in the assignment history, optionally
    /// overwrites the operator due date (never the SLA deadline), and returns
    /// an in-flight task to the active queue: `InProgress`/`Resolved` reset
    /// to `Open`, `Verified` stays final.
    pub async fn reassign_task(
        &self,
        task_id: Uuid,
        new_assignee: &str,
        actor: &str,
        due_date: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> PipelineResult<Task> {
        let new_assignee = new_assignee.to_string();
        let actor = actor.to_string();
        let updated = self
            .tasks
            .update_task(
                task_id,
                Box::new(move |task| {
                    let previous = task.assigned_to.clone();
                    let reason = reason.unwrap_or_else(|| "Task Transfer".to_string());

                    task.assignment_history.push(AssignmentRecord {
                        assigned_to: previous.clone(),
                        assigned_by: actor.clone(),
                        assigned_at: Utc::now(),
                        reason: reason.clone(),
                    });

                    task.assigned_to = new_assignee.clone();
                    if let Some(due) = due_date {
                        task.due_date = Some(due);
                    }
                    if task.status.resets_on_reassign() {
                        task.status = TaskStatus::Open;
                    }

                    task.history.push(HistoryEntry::new(
                        HistoryAction::Reassigned,
                        actor,
                        Some(format!(
                            "Transferred from {previous} to {new_assignee}. Reason: {reason}"
                        )),
                    ));
                }),
            )
            .await?;

        updated.ok_or(PipelineError::TaskNotFound { task_id })
    }

    /// Tasks for a tenant, most urgent first: priority (`High` before
    /// `Medium` before `Low`), then soonest SLA deadline. Lookup errors
    /// propagate — callers must be able to tell "no tasks" from "query
    /// failed".
    pub async fn get_tasks(
        &self,
        tenant_id: Uuid,
        filter: &TaskFilter,
    ) -> PipelineResult<Vec<Task>> {
        let mut tasks = self.tasks.query_tasks(tenant_id, filter).await?;
        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.sla_breach_at.cmp(&b.sla_breach_at))
        });
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OperatingMode, RetryPolicy};
    use crate::model::{
        CustomerContext, Metrics, StoreLocation, SubmissionSource, Tenant, TenantSettings,
    };
    use crate::notify::{ContactMessage, NotificationTransport, TransportError};
    use crate::store::MemoryBackend;
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl NotificationTransport for NullTransport {
        async fn send_message(&self, _m: &ContactMessage) -> Result<(), TransportError> {
            Ok(())
        }
        async fn post_webhook(
            &self,
            _url: &str,
            _p: &serde_json::Value,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn engine(backend: Arc<MemoryBackend>) -> EscalationEngine {
        let dispatcher = Dispatcher::new(
            Arc::new(NullTransport),
            RetryPolicy::default(),
            OperatingMode::Development,
        );
        EscalationEngine::new(backend.clone(), backend, dispatcher)
    }

    fn tenant() -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "Cafe Nine".to_string(),
            owner_email: "owner@cafenine.example".to_string(),
            owner_phone: "+15550100".to_string(),
            webhook_url: None,
            settings: TenantSettings::default(),
        }
    }

    fn response(
        tenant_id: Uuid,
        nps: Option<i32>,
        csat: Option<i32>,
        store_id: Option<Uuid>,
    ) -> Response {
        Response {
            id: Uuid::new_v4(),
            tenant_id,
            form_id: Uuid::new_v4(),
            customer: CustomerContext {
                phone: None,
                order_id: None,
                store_id,
                source: SubmissionSource::QrStatic,
            },
            metrics: Metrics {
                nps_score: nps,
                csat_score: csat,
            },
            answers: vec![],
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_no_task_when_neither_threshold_breached() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, Some(7), Some(3), None), &tenant)
            .await;
        assert!(task.is_none());
        assert_eq!(backend.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_nps_six_creates_task_regardless_of_csat() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, Some(6), Some(5), None), &tenant)
            .await
            .expect("NPS 6 breaches the threshold");
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.assigned_to, tenant.owner_email);
        assert_eq!(backend.task_count().await, 1);
    }

    #[tokio::test]
    async fn test_low_csat_alone_creates_task() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, None, Some(2), None), &tenant)
            .await;
        assert!(task.is_some());
    }

    #[tokio::test]
    async fn test_missing_scores_default_to_benefit_of_the_doubt() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, None, None, None), &tenant)
            .await;
        assert!(task.is_none(), "absent scores must never escalate");
    }

    #[tokio::test]
    async fn test_priority_high_for_very_low_nps() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, Some(2), None, None), &tenant)
            .await
            .unwrap();
        assert_eq!(task.priority, TaskPriority::High);
    }

    #[tokio::test]
    async fn test_priority_medium_for_moderately_low_nps() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, Some(5), None, None), &tenant)
            .await
            .unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
    }

    #[tokio::test]
    async fn test_sla_is_24_hours_from_creation_for_all_priorities() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        for nps in [1, 5] {
            let task = engine
                .check_and_create_task(&response(tenant.id, Some(nps), None, None), &tenant)
                .await
                .unwrap();
            assert_eq!(task.sla_breach_at - task.created_at, Duration::hours(24));
        }
    }

    #[tokio::test]
    async fn test_assignment_prefers_store_manager() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let store = StoreLocation {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "Downtown".to_string(),
            manager_email: Some("manager@cafenine.example".to_string()),
        };
        backend.seed_store(store.clone()).await;

        let task = engine
            .check_and_create_task(
                &response(tenant.id, Some(4), None, Some(store.id)),
                &tenant,
            )
            .await
            .unwrap();
        assert_eq!(task.assigned_to, "manager@cafenine.example");
        assert_eq!(task.location_id, Some(store.id));
    }

    #[tokio::test]
    async fn test_assignment_falls_back_to_owner_without_manager() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let store = StoreLocation {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "Airport".to_string(),
            manager_email: None,
        };
        backend.seed_store(store.clone()).await;

        let task = engine
            .check_and_create_task(
                &response(tenant.id, Some(4), None, Some(store.id)),
                &tenant,
            )
            .await
            .unwrap();
        assert_eq!(task.assigned_to, tenant.owner_email);
        assert_eq!(task.location_id, Some(store.id));
    }

    #[tokio::test]
    async fn test_unknown_store_id_keeps_owner_assignment() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(
                &response(tenant.id, Some(4), None, Some(Uuid::new_v4())),
                &tenant,
            )
            .await
            .unwrap();
        assert_eq!(task.assigned_to, tenant.owner_email);
        assert_eq!(task.location_id, None);
    }

    #[tokio::test]
    async fn test_creation_writes_one_system_history_entry() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = engine
            .check_and_create_task(&response(tenant.id, Some(3), None, None), &tenant)
            .await
            .unwrap();
        assert_eq!(task.history.len(), 1);
        let entry = &task.history[0];
        assert_eq!(entry.action, HistoryAction::Created);
        assert_eq!(entry.actor, SYSTEM_ACTOR);
        assert!(entry.note.as_deref().unwrap().contains("NPS: 3"));
    }

    async fn create_open_task(engine: &EscalationEngine, tenant: &Tenant) -> Task {
        engine
            .check_and_create_task(&response(tenant.id, Some(2), None, None), tenant)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_sets_fields_and_appends_history() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;

        let resolved = engine
            .resolve_task(
                task.id,
                "manager@cafenine.example",
                Some("Called the customer and comped the order".to_string()),
                Some("https://uploads.example.com/proof.jpg".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(resolved.status, TaskStatus::Resolved);
        assert_eq!(
            resolved.resolution_note.as_deref(),
            Some("Called the customer and comped the order")
        );
        assert_eq!(
            resolved.resolution_proof_url.as_deref(),
            Some("https://uploads.example.com/proof.jpg")
        );
        assert_eq!(resolved.history.len(), 2);
        assert_eq!(resolved.history[1].action, HistoryAction::Resolved);
        assert_eq!(resolved.history[1].actor, "manager@cafenine.example");
    }

    #[tokio::test]
    async fn test_resolve_without_note_uses_default_note() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;

        let resolved = engine
            .resolve_task(task.id, "owner@cafenine.example", None, None)
            .await
            .unwrap();
        assert_eq!(resolved.resolution_note, None);
        assert_eq!(
            resolved.history[1].note.as_deref(),
            Some("Marked as resolved")
        );
    }

    #[tokio::test]
    async fn test_resolve_missing_task_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend);
        let missing = Uuid::new_v4();

        let err = engine
            .resolve_task(missing, "owner@cafenine.example", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TaskNotFound { task_id } if task_id == missing));
    }

    #[tokio::test]
    async fn test_reassign_resolved_task_resets_to_open() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;
        engine
            .resolve_task(task.id, "owner@cafenine.example", None, None)
            .await
            .unwrap();

        let reassigned = engine
            .reassign_task(
                task.id,
                "shift-lead@cafenine.example",
                "owner@cafenine.example",
                None,
                Some("Original assignee on leave".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(reassigned.status, TaskStatus::Open);
        assert_eq!(reassigned.assigned_to, "shift-lead@cafenine.example");
        // Exactly one assignment record, carrying the *previous* assignee.
        assert_eq!(reassigned.assignment_history.len(), 1);
        let record = &reassigned.assignment_history[0];
        assert_eq!(record.assigned_to, tenant.owner_email);
        assert_eq!(record.assigned_by, "owner@cafenine.example");
        assert_eq!(record.reason, "Original assignee on leave");
        // CREATED + RESOLVED + REASSIGNED.
        assert_eq!(reassigned.history.len(), 3);
        assert_eq!(reassigned.history[2].action, HistoryAction::Reassigned);
    }

    #[tokio::test]
    async fn test_reassign_verified_task_keeps_status() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;
        // Verification is an external collaborator's transition.
        backend
            .update_task(
                task.id,
                Box::new(|t| {
                    t.status = TaskStatus::Verified;
                }),
            )
            .await
            .unwrap();

        let reassigned = engine
            .reassign_task(
                task.id,
                "auditor@cafenine.example",
                "owner@cafenine.example",
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(reassigned.status, TaskStatus::Verified);
        assert_eq!(reassigned.assigned_to, "auditor@cafenine.example");
    }

    #[tokio::test]
    async fn test_reassign_due_date_never_touches_sla() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;
        let original_sla = task.sla_breach_at;
        let new_due = Utc::now() + Duration::days(3);

        let reassigned = engine
            .reassign_task(
                task.id,
                "shift-lead@cafenine.example",
                "owner@cafenine.example",
                Some(new_due),
                None,
            )
            .await
            .unwrap();
        assert_eq!(reassigned.due_date, Some(new_due));
        assert_eq!(reassigned.sla_breach_at, original_sla);
    }

    #[tokio::test]
    async fn test_reassign_defaults_reason_to_task_transfer() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;

        let reassigned = engine
            .reassign_task(
                task.id,
                "shift-lead@cafenine.example",
                "owner@cafenine.example",
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(reassigned.assignment_history[0].reason, "Task Transfer");
    }

    #[tokio::test]
    async fn test_history_grows_by_exactly_one_per_mutation() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();
        let task = create_open_task(&engine, &tenant).await;
        let mut expected_len = task.history.len();

        for round in 0..3 {
            let resolved = engine
                .resolve_task(task.id, "owner@cafenine.example", None, None)
                .await
                .unwrap();
            expected_len += 1;
            assert_eq!(resolved.history.len(), expected_len);

            let reassigned = engine
                .reassign_task(
                    task.id,
                    &format!("assignee-{round}@cafenine.example"),
                    "owner@cafenine.example",
                    None,
                    None,
                )
                .await
                .unwrap();
            expected_len += 1;
            assert_eq!(reassigned.history.len(), expected_len);
            assert_eq!(reassigned.assignment_history.len(), round + 1);
        }
    }

    #[tokio::test]
    async fn test_get_tasks_sorts_by_priority_then_sla() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        // Medium priority, earliest SLA.
        let medium = engine
            .check_and_create_task(&response(tenant.id, Some(5), None, None), &tenant)
            .await
            .unwrap();
        // Two high-priority tasks created afterwards, so later SLAs.
        let high_a = engine
            .check_and_create_task(&response(tenant.id, Some(1), None, None), &tenant)
            .await
            .unwrap();
        let high_b = engine
            .check_and_create_task(&response(tenant.id, Some(2), None, None), &tenant)
            .await
            .unwrap();
        // Force a deterministic SLA order between the two high tasks.
        backend
            .update_task(
                high_b.id,
                Box::new(move |t| {
                    t.sla_breach_at = t.sla_breach_at - Duration::hours(2);
                }),
            )
            .await
            .unwrap();

        let tasks = engine
            .get_tasks(tenant.id, &TaskFilter::default())
            .await
            .unwrap();
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![high_b.id, high_a.id, medium.id]);
    }

    #[tokio::test]
    async fn test_get_tasks_applies_filters() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine(backend.clone());
        let tenant = tenant();

        let task = create_open_task(&engine, &tenant).await;
        engine
            .resolve_task(task.id, "owner@cafenine.example", None, None)
            .await
            .unwrap();
        create_open_task(&engine, &tenant).await;

        let open_only = engine
            .get_tasks(
                tenant.id,
                &TaskFilter {
                    status: Some(TaskStatus::Open),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(open_only.len(), 1);
        assert_eq!(open_only[0].status, TaskStatus::Open);
    }
}
