//! In-process backend implementing every storage and directory seam.
//!
//! Task mutations take the write lock for the whole read-modify-write, which
//! gives the per-task append atomicity the [`super::TaskStore`] contract
//! requires. Good enough for tests and embedded single-process deployments;
//! a real database adapter replaces this wholesale.

use crate::error::StorageError;
use crate::escalation::task::{Task, TaskFilter};
use crate::model::{FormSchema, Response, StoreLocation, Tenant};
use crate::store::{FormDirectory, ResponseStore, StoreDirectory, TaskStore, TenantDirectory};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBackend {
    tenants: RwLock<HashMap<Uuid, Tenant>>,
    stores: RwLock<HashMap<Uuid, StoreLocation>>,
    forms: RwLock<HashMap<Uuid, FormSchema>>,
    responses: RwLock<HashMap<Uuid, Response>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_tenant(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id, tenant);
    }

    pub async fn seed_store(&self, store: StoreLocation) {
        self.stores.write().await.insert(store.id, store);
    }

    pub async fn seed_form(&self, form: FormSchema) {
        self.forms.write().await.insert(form.id, form);
    }

    /// Snapshot of all stored responses, for assertions in tests.
    pub async fn responses(&self) -> Vec<Response> {
        self.responses.read().await.values().cloned().collect()
    }

    pub async fn response_count(&self) -> usize {
        self.responses.read().await.len()
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl ResponseStore for MemoryBackend {
    async fn insert_response(&self, response: Response) -> Result<(), StorageError> {
        self.responses.write().await.insert(response.id, response);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryBackend {
    async fn insert_task(&self, task: Task) -> Result<(), StorageError> {
        self.tasks.write().await.insert(task.id, task);
        Ok(())
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StorageError> {
        Ok(self.tasks.read().await.get(&task_id).cloned())
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        apply: Box<dyn for<'a> FnOnce(&'a mut Task) + Send>,
    ) -> Result<Option<Task>, StorageError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task_id) {
            Some(task) => {
                apply(task);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn query_tasks(
        &self,
        tenant_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, StorageError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.tenant_id == tenant_id && filter.matches(t))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreDirectory for MemoryBackend {
    async fn find_store(&self, store_id: Uuid) -> Result<Option<StoreLocation>, StorageError> {
        Ok(self.stores.read().await.get(&store_id).cloned())
    }
}

#[async_trait]
impl TenantDirectory for MemoryBackend {
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, StorageError> {
        Ok(self.tenants.read().await.get(&tenant_id).cloned())
    }
}

#[async_trait]
impl FormDirectory for MemoryBackend {
    async fn find_form(
        &self,
        tenant_id: Uuid,
        form_id: Option<Uuid>,
    ) -> Result<Option<FormSchema>, StorageError> {
        let forms = self.forms.read().await;
        match form_id {
            Some(id) => Ok(forms.get(&id).cloned()),
            None => Ok(forms
                .values()
                .find(|f| f.tenant_id == tenant_id && f.active)
                .cloned()),
        }
    }
}
