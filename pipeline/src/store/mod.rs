//! Persistence and directory seams.
//!
//! The pipeline does not own a database. It talks to five narrow async
//! traits; the environment supplies the implementations. [`MemoryBackend`]
//! implements all of them over in-process maps and is what the tests (and
//! embedded deployments) use.

pub mod memory;

use crate::error::StorageError;
use crate::escalation::task::{Task, TaskFilter};
use crate::model::{FormSchema, Response, StoreLocation, Tenant};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryBackend;

/// Write-once storage for customer responses.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn insert_response(&self, response: Response) -> Result<(), StorageError>;
}

/// Storage for remediation tasks.
///
/// `update_task` is the only mutation path after creation. Implementations
/// must apply the closure as an atomic read-modify-write against the current
/// document so that concurrent resolve/reassign calls on the same task never
/// lose a history append: the last writer determines the final status and
/// assignee, but both writers' entries survive.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> Result<(), StorageError>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StorageError>;

    /// Atomically apply `apply` to the task, returning the updated document,
    /// or `None` if the id does not resolve.
    async fn update_task(
        &self,
        task_id: Uuid,
        apply: Box<dyn for<'a> FnOnce(&'a mut Task) + Send>,
    ) -> Result<Option<Task>, StorageError>;

    /// Tasks for a tenant matching the filter, in no particular order.
    async fn query_tasks(
        &self,
        tenant_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, StorageError>;
}

/// Read-only lookup of store locations.
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn find_store(&self, store_id: Uuid) -> Result<Option<StoreLocation>, StorageError>;
}

/// Read-only lookup of tenants and their governance settings.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, StorageError>;
}

/// Read-only lookup of form schemas.
#[async_trait]
pub trait FormDirectory: Send + Sync {
    /// Resolve a form by explicit id, or the tenant's active form when no id
    /// is given.
    async fn find_form(
        &self,
        tenant_id: Uuid,
        form_id: Option<Uuid>,
    ) -> Result<Option<FormSchema>, StorageError>;
}
