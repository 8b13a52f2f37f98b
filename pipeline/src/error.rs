//! Pipeline error types.
//!
//! Only direct, synchronous operations (resolve, reassign, query, submit
//! lookups) surface these to the caller. Best-effort side channels — alerts
//! and auto-escalation — absorb their failures at their own boundary and
//! surface them through structured logs instead.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure from a persistence or directory backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors surfaced by the pipeline's synchronous operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("tenant not found: {tenant_id}")]
    TenantNotFound { tenant_id: Uuid },

    #[error("no active form found for tenant {tenant_id}")]
    FormNotFound { tenant_id: Uuid },

    /// A governance rule rejected the request at the API boundary.
    #[error("policy violation: {rule}")]
    PolicyViolation { rule: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn task_not_found(task_id: Uuid) -> Self {
        Self::TaskNotFound { task_id }
    }

    pub fn tenant_not_found(tenant_id: Uuid) -> Self {
        Self::TenantNotFound { tenant_id }
    }

    pub fn policy(rule: impl Into<String>) -> Self {
        Self::PolicyViolation { rule: rule.into() }
    }

    /// Whether retrying the same call could succeed. Not-found and policy
    /// rejections are deterministic; storage failures may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
