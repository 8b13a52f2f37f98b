//! Ingestion orchestrator.
//!
//! Receives a validated submission, computes metrics, persists the response,
//! and fans out to the notification dispatcher and the escalation engine as
//! detached background tasks. The caller gets its acknowledgment as soon as
//! the response is durably persisted; nothing downstream can fail the
//! submission. There is no durable retry across process restarts — an
//! accepted limitation, not a queue.

use crate::error::{PipelineError, PipelineResult};
use crate::escalation::EscalationEngine;
use crate::metrics::{extract_metrics, should_trigger_alert};
use crate::model::{Answer, CustomerContext, Metrics, Response, SubmissionSource, Tenant};
use crate::notify::Dispatcher;
use crate::store::{FormDirectory, ResponseStore, TenantDirectory};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A validated inbound submission. Payload validation, duplicate-order
/// suppression, and abuse filtering beyond the honeypot are the caller's
/// concern.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tenant_id: Uuid,
    /// Explicit form, or the tenant's active form when absent.
    pub form_id: Option<Uuid>,
    pub answers: Vec<Answer>,
    pub phone: Option<String>,
    pub order_id: Option<String>,
    pub store_id: Option<Uuid>,
    /// Hidden form field; humans leave it empty, bots fill it in.
    pub honeypot: Option<String>,
}

/// Acknowledgment returned once the response is persisted.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub response_id: Uuid,
    pub metrics: Metrics,
    pub tenant_name: String,
}

pub struct Orchestrator {
    tenants: Arc<dyn TenantDirectory>,
    forms: Arc<dyn FormDirectory>,
    responses: Arc<dyn ResponseStore>,
    engine: Arc<EscalationEngine>,
    dispatcher: Dispatcher,
}

impl Orchestrator {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        forms: Arc<dyn FormDirectory>,
        responses: Arc<dyn ResponseStore>,
        engine: Arc<EscalationEngine>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            tenants,
            forms,
            responses,
            engine,
            dispatcher,
        }
    }

    /// Ingest a submission and trigger the downstream pipeline.
    ///
    /// Tenant/form lookup failures propagate; everything after the response
    /// insert runs detached and only ever logs.
    pub async fn submit(&self, submission: Submission) -> PipelineResult<SubmitReceipt> {
        // Bots that fill the hidden field get a fake success before any
        // lookup, so they cannot learn whether the tenant even exists.
        // Nothing is persisted.
        if let Some(honeypot) = &submission.honeypot {
            if !honeypot.trim().is_empty() {
                info!(
                    tenant_id = %submission.tenant_id,
                    "honeypot filled, dropping submission"
                );
                return Ok(SubmitReceipt {
                    response_id: Uuid::nil(),
                    metrics: Metrics::default(),
                    tenant_name: String::new(),
                });
            }
        }

        let tenant = self
            .tenants
            .get_tenant(submission.tenant_id)
            .await?
            .ok_or(PipelineError::TenantNotFound {
                tenant_id: submission.tenant_id,
            })?;

        let form = self
            .forms
            .find_form(submission.tenant_id, submission.form_id)
            .await?
            .ok_or(PipelineError::FormNotFound {
                tenant_id: submission.tenant_id,
            })?;

        let metrics = extract_metrics(&submission.answers, &form.fields);

        let source = if submission.order_id.is_some() {
            SubmissionSource::QrMagic
        } else {
            SubmissionSource::QrStatic
        };

        let response = Response {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            form_id: form.id,
            customer: CustomerContext {
                phone: submission.phone,
                order_id: submission.order_id,
                store_id: submission.store_id,
                source,
            },
            metrics,
            answers: submission.answers,
            submitted_at: Utc::now(),
        };

        self.responses.insert_response(response.clone()).await?;
        info!(
            tenant_id = %tenant.id,
            response_id = %response.id,
            nps = response.metrics.nps_score,
            csat = response.metrics.csat_score,
            "response persisted"
        );

        self.fan_out(tenant.clone(), response.clone());

        Ok(SubmitReceipt {
            response_id: response.id,
            metrics,
            tenant_name: tenant.name,
        })
    }

    /// Launch the three independent side effects. None of them is awaited by
    /// the request path, none blocks another, and each absorbs its own
    /// failures.
    fn fan_out(&self, tenant: Tenant, response: Response) {
        if should_trigger_alert(response.metrics.nps_score, tenant.settings.alert_threshold) {
            let dispatcher = self.dispatcher.clone();
            let tenant = tenant.clone();
            let response = response.clone();
            tokio::spawn(async move {
                dispatcher.send_low_score_alert(&tenant, &response).await;
            });
        }

        if tenant.webhook_url.is_some() {
            let dispatcher = self.dispatcher.clone();
            let tenant = tenant.clone();
            let response = response.clone();
            tokio::spawn(async move {
                dispatcher.send_webhook(&tenant, &response).await;
            });
        }

        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            // Engine failures are logged internally; nothing to surface here.
            engine.check_and_create_task(&response, &tenant).await;
        });
    }
}
