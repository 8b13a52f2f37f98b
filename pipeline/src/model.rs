//! Core data model — responses, tenants, stores, and form schemas.
//!
//! `Response` and `Metrics` are write-once: they are created by the ingestion
//! orchestrator and never mutated afterwards. Everything the escalation side
//! mutates lives in [`crate::escalation::task`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the customer reached the feedback form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    /// Static QR code at the counter — no order context.
    QrStatic,
    /// Per-order QR code — carries an order id.
    QrMagic,
}

/// A single (question, value) pair as submitted by the customer.
///
/// `value` is untyped on purpose: free-text, phone and rating answers all
/// travel through the same list. The metrics extractor only interprets values
/// whose schema field type is a rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: serde_json::Value,
}

/// Derived score summary, computed once at ingestion time.
///
/// `None` means the form had no such question or the respondent skipped it.
/// Scores are never recomputed later: doing so would require replaying the
/// schema version that was active at submission time, which is not retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// NPS score clamped to [0, 10].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nps_score: Option<i32>,
    /// CSAT score clamped to [1, 5].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csat_score: Option<i32>,
}

/// Customer context attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    pub source: SubmissionSource,
}

/// One customer submission, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub form_id: Uuid,
    pub customer: CustomerContext,
    pub metrics: Metrics,
    pub answers: Vec<Answer>,
    pub submitted_at: DateTime<Utc>,
}

/// Declared type of a form field. Only `Nps` and `Csat` contribute to
/// [`Metrics`]; everything else is preserved in the raw answer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Nps,
    Csat,
    Text,
    Phone,
    #[serde(other)]
    Other,
}

/// A field declaration in a form schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// The field-type schema of a form, as it was at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub fields: Vec<FieldDefinition>,
    pub active: bool,
}

/// Per-tenant task governance policy.
///
/// Consumed read-only by the task API boundary; the escalation engine itself
/// never checks these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGovernance {
    pub require_resolution_note: bool,
    pub require_resolution_proof: bool,
    pub allow_reassignment: bool,
}

impl Default for TaskGovernance {
    fn default() -> Self {
        Self {
            require_resolution_note: true,
            require_resolution_proof: false,
            allow_reassignment: true,
        }
    }
}

/// Tenant-level pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    /// NPS scores strictly below this trigger an owner alert.
    pub alert_threshold: i32,
    pub task_config: TaskGovernance,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            alert_threshold: 5,
            task_config: TaskGovernance::default(),
        }
    }
}

/// A tenant as seen by the pipeline: display info, owner contacts, and
/// governance settings. Account management is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub owner_email: String,
    pub owner_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub settings: TenantSettings,
}

/// A physical location of a tenant. Only the fields the escalation engine
/// reads; the full store record is owned elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreLocation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_email: Option<String>,
}
