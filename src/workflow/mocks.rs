// Test doubles for the workflow stores

use async_trait::async_trait;
use std::sync::Mutex;

use super::errors::StoreError;
use super::memory::InMemoryStore;
use super::roles::RoleSet;
use super::traits::{GroupDirectory, RoleDirectory, WorkflowStore, WorkflowTx};
use super::types::{ItemFilter, OperatorRelation, WorkItem, WorkItemKind};

#[derive(Debug, Clone)]
struct Interleaved {
    code: String,
    from: String,
    to: String,
}

/// Memory store that can slip another request's status change in between a
/// request's reads and its transaction
pub struct InterleavingStore {
    pub inner: InMemoryStore,
    interleave: Mutex<Option<Interleaved>>,
    begun: Mutex<u32>,
}

impl InterleavingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            interleave: Mutex::new(None),
            begun: Mutex::new(0),
        }
    }

    /// The next `begin` first commits `code: from -> to` on behalf of somebody else
    pub fn move_before_next_transaction(&self, code: &str, from: &str, to: &str) {
        *self.interleave.lock().unwrap() = Some(Interleaved {
            code: code.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    pub fn transactions_begun(&self) -> u32 {
        *self.begun.lock().unwrap()
    }
}

#[async_trait]
impl WorkflowStore for InterleavingStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let interleaved = self.interleave.lock().unwrap().take();
        if let Some(change) = interleaved {
            let mut tx = self.inner.begin().await?;
            tx.compare_and_set_status(&change.code, &change.from, &change.to, "intruder")
                .await?;
            tx.commit().await?;
        }
        *self.begun.lock().unwrap() += 1;
        self.inner.begin().await
    }

    async fn find_item(&self, code: &str) -> Result<Option<WorkItem>, StoreError> {
        self.inner.find_item(code).await
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<(u64, Vec<WorkItem>), StoreError> {
        self.inner.list_items(filter).await
    }

    async fn relations_of(&self, code: &str) -> Result<Vec<OperatorRelation>, StoreError> {
        self.inner.relations_of(code).await
    }

    async fn count_assigned(&self, uid: &str) -> Result<u64, StoreError> {
        self.inner.count_assigned(uid).await
    }

    async fn count_open(
        &self,
        kind: WorkItemKind,
        terminal: &[&'static str],
    ) -> Result<u64, StoreError> {
        self.inner.count_open(kind, terminal).await
    }
}

#[async_trait]
impl RoleDirectory for InterleavingStore {
    async fn roles_of(&self, uid: &str) -> Result<RoleSet, StoreError> {
        self.inner.roles_of(uid).await
    }
}

#[async_trait]
impl GroupDirectory for InterleavingStore {
    async fn group_of(&self, uid: &str) -> Result<Option<String>, StoreError> {
        self.inner.group_of(uid).await
    }
}
