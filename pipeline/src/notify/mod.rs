//! Notification dispatcher — best-effort sends with bounded retries.
//!
//! This is a side channel by design: `send_*` never returns an error to the
//! caller. A send either lands (`Sent`) or is given up on (`Suppressed`)
//! after the retry budget is spent, with every attempt visible in the logs
//! under structured tags (`ALERT_TRIGGERED`, `ALERT_SUCCESS`, `ALERT_RETRY`,
//! `ALERT_FAILED`).

pub mod transport;

use crate::config::{OperatingMode, RetryPolicy};
use crate::escalation::task::Task;
use crate::model::{Response, Tenant};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use transport::{
    ContactMessage, HttpTransport, MessageTemplate, NotificationTransport, TransportError,
};

/// Terminal outcome of a dispatch. There is no error variant on purpose:
/// "suppressed" means "nothing more to do", not "handle this".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Suppressed,
}

impl DispatchOutcome {
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}

/// Log correlation context carried through a dispatch.
#[derive(Debug, Clone, Copy)]
struct DispatchContext {
    service: &'static str,
    tenant_id: Uuid,
    response_id: Option<Uuid>,
}

/// Retrying notification dispatcher over an injected transport.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn NotificationTransport>,
    retry: RetryPolicy,
    mode: OperatingMode,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        retry: RetryPolicy,
        mode: OperatingMode,
    ) -> Self {
        Self {
            transport,
            retry,
            mode,
        }
    }

    /// Channel 1: templated low-score alert to the tenant owner's contact.
    pub async fn send_low_score_alert(
        &self,
        tenant: &Tenant,
        response: &Response,
    ) -> DispatchOutcome {
        let nps_score = response.metrics.nps_score.unwrap_or(0);
        info!(
            tag = "ALERT_TRIGGERED",
            tenant_id = %tenant.id,
            response_id = %response.id,
            nps_score,
            order_id = response.customer.order_id.as_deref(),
            "low NPS alert for {}",
            tenant.name
        );

        if self.short_circuit("low_score_alert") {
            return DispatchOutcome::Sent;
        }

        let message = ContactMessage {
            to: tenant.owner_phone.clone(),
            template: MessageTemplate::LowScoreAlert {
                tenant_name: tenant.name.clone(),
                nps_score,
                order_id: response.customer.order_id.clone(),
                customer_phone: response.customer.phone.clone(),
            },
        };

        let ctx = DispatchContext {
            service: "low_score_alert",
            tenant_id: tenant.id,
            response_id: Some(response.id),
        };
        let transport = Arc::clone(&self.transport);
        let outcome = self
            .with_retry(ctx, move || {
                let transport = Arc::clone(&transport);
                let message = message.clone();
                async move { transport.send_message(&message).await }
            })
            .await;

        if outcome.is_sent() {
            info!(
                tag = "ALERT_SUCCESS",
                service = ctx.service,
                tenant_id = %tenant.id,
                "low score alert sent"
            );
        }
        outcome
    }

    /// Channel 1, addressed to a task assignee rather than the owner.
    pub async fn send_task_alert(
        &self,
        tenant: &Tenant,
        task: &Task,
        recipient: &str,
        location_name: Option<&str>,
    ) -> DispatchOutcome {
        if self.short_circuit("task_alert") {
            return DispatchOutcome::Sent;
        }

        let message = ContactMessage {
            to: recipient.to_string(),
            template: MessageTemplate::TaskAssigned {
                tenant_name: tenant.name.clone(),
                location_name: location_name.map(str::to_string),
                task_id: task.id,
                response_id: task.response_id,
                priority: task.priority,
                sla_breach_at: task.sla_breach_at,
            },
        };

        let ctx = DispatchContext {
            service: "task_alert",
            tenant_id: tenant.id,
            response_id: Some(task.response_id),
        };
        let transport = Arc::clone(&self.transport);
        let outcome = self
            .with_retry(ctx, move || {
                let transport = Arc::clone(&transport);
                let message = message.clone();
                async move { transport.send_message(&message).await }
            })
            .await;

        if outcome.is_sent() {
            info!(
                tag = "ALERT_SUCCESS",
                service = ctx.service,
                tenant_id = %tenant.id,
                task_id = %task.id,
                recipient,
                "task alert sent"
            );
        }
        outcome
    }

    /// Channel 2: generic JSON webhook for every new response, if the tenant
    /// has a webhook URL configured.
    pub async fn send_webhook(&self, tenant: &Tenant, response: &Response) -> DispatchOutcome {
        let Some(webhook_url) = tenant.webhook_url.clone() else {
            return DispatchOutcome::Suppressed;
        };

        if self.short_circuit("webhook") {
            return DispatchOutcome::Sent;
        }

        let payload = json!({
            "event": "new_response",
            "tenantId": tenant.id,
            "response": {
                "id": response.id,
                "metrics": response.metrics,
                "customer": response.customer,
                "submittedAt": response.submitted_at,
            },
        });

        let ctx = DispatchContext {
            service: "webhook",
            tenant_id: tenant.id,
            response_id: Some(response.id),
        };
        let transport = Arc::clone(&self.transport);
        let url = webhook_url.clone();
        let outcome = self
            .with_retry(ctx, move || {
                let transport = Arc::clone(&transport);
                let url = url.clone();
                let payload = payload.clone();
                async move { transport.post_webhook(&url, &payload).await }
            })
            .await;

        if outcome.is_sent() {
            info!(
                tag = "ALERT_SUCCESS",
                service = ctx.service,
                tenant_id = %tenant.id,
                webhook_url = %webhook_url,
                "webhook sent"
            );
        }
        outcome
    }

    /// Outside production, pretend every send succeeded.
    fn short_circuit(&self, service: &'static str) -> bool {
        if self.mode == OperatingMode::Production {
            return false;
        }
        debug!(
            tag = "ALERT_DEV",
            service, "non-production mode, send skipped"
        );
        true
    }

    /// Run an attempt up to `max_retries + 1` times with linear backoff.
    ///
    /// 4xx statuses other than 429 abort immediately; everything else (5xx,
    /// 429, network failures, timeouts) retries until the budget is spent.
    async fn with_retry<F, Fut>(&self, ctx: DispatchContext, mut attempt_fn: F) -> DispatchOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        let max_attempts = self.retry.total_attempts();
        let mut last_error: Option<TransportError> = None;
        let mut attempts_made = 0;

        for attempt in 1..=max_attempts {
            attempts_made = attempt;
            match attempt_fn().await {
                Ok(()) => return DispatchOutcome::Sent,
                Err(err) => {
                    warn!(
                        tag = "ALERT_RETRY",
                        service = ctx.service,
                        tenant_id = %ctx.tenant_id,
                        response_id = ?ctx.response_id,
                        attempt,
                        max_attempts,
                        status = ?err.status(),
                        error = %err,
                        "{} attempt {}/{} failed",
                        ctx.service,
                        attempt,
                        max_attempts
                    );

                    let permanent = err.is_permanent();
                    last_error = Some(err);
                    if permanent {
                        break;
                    }
                    // No wait after the final attempt.
                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_millis(
                            self.retry.delay_ms * u64::from(attempt),
                        ))
                        .await;
                    }
                }
            }
        }

        error!(
            tag = "ALERT_FAILED",
            service = ctx.service,
            tenant_id = %ctx.tenant_id,
            response_id = ?ctx.response_id,
            error = last_error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            "{} failed after {} attempts",
            ctx.service,
            attempts_made
        );
        DispatchOutcome::Suppressed
    }
}
