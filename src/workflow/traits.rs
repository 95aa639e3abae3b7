// Traits for dependency injection - the engine only sees these seams

use async_trait::async_trait;

use super::errors::StoreError;
use super::roles::RoleSet;
use super::types::{ItemFilter, ItemPatch, OperatorRelation, RelationType, WorkItem, WorkItemKind};

/// A ledger row about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelation {
    pub code: String,
    pub uid: String,
    pub relation_type: RelationType,
    pub old_status: String,
    pub new_status: Option<String>,
    pub description: Option<String>,
    pub actor: String,
}

/// How pending rows are closed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationUpdate {
    pub relation_type: RelationType,
    pub new_status: Option<String>,
    pub description: Option<String>,
    pub actor: String,
}

/// Read side of the workflow store plus the entry point for transactions
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Open a transaction. Dropping it without `commit` rolls everything back.
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError>;

    async fn find_item(&self, code: &str) -> Result<Option<WorkItem>, StoreError>;

    /// Total matching rows and the requested window of them
    async fn list_items(&self, filter: &ItemFilter) -> Result<(u64, Vec<WorkItem>), StoreError>;

    /// Every ledger row for an item, oldest first
    async fn relations_of(&self, code: &str) -> Result<Vec<OperatorRelation>, StoreError>;

    /// HANDLING rows addressed to `uid` across all items
    async fn count_assigned(&self, uid: &str) -> Result<u64, StoreError>;

    /// Items of `kind` whose status is not one of `terminal`
    async fn count_open(
        &self,
        kind: WorkItemKind,
        terminal: &[&'static str],
    ) -> Result<u64, StoreError>;
}

/// Write side. Everything one request changes goes through a single transaction.
#[async_trait]
pub trait WorkflowTx: Send {
    /// Post-increment value of the counter for `prefix`, starting at 1
    async fn next_sequence(&mut self, prefix: &str, actor: &str) -> Result<i64, StoreError>;

    async fn insert_item(&mut self, item: &WorkItem) -> Result<(), StoreError>;

    /// Write `new` only if the row still holds `expected`. `Ok(false)` means somebody else won.
    async fn compare_and_set_status(
        &mut self,
        code: &str,
        expected: &str,
        new: &str,
        actor: &str,
    ) -> Result<bool, StoreError>;

    async fn update_fields(
        &mut self,
        code: &str,
        patch: &ItemPatch,
        actor: &str,
    ) -> Result<(), StoreError>;

    async fn insert_relation(&mut self, relation: &NewRelation) -> Result<i64, StoreError>;

    /// HANDLING rows for (code, status), optionally narrowed to one user
    async fn pending_relations(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
    ) -> Result<Vec<OperatorRelation>, StoreError>;

    async fn count_pending(&mut self, code: &str, status: &str) -> Result<u64, StoreError>;

    /// Rows `uid` already closed as `relation_type` at (code, status)
    async fn count_decided(
        &mut self,
        code: &str,
        status: &str,
        uid: &str,
        relation_type: RelationType,
    ) -> Result<u64, StoreError>;

    /// Close out HANDLING rows for (code, status), optionally only `uid`'s. Returns rows changed.
    async fn close_pending(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
        update: &RelationUpdate,
    ) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Role lookup owned by user management
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn roles_of(&self, uid: &str) -> Result<RoleSet, StoreError>;
}

/// Team membership, used to prefix story codes
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn group_of(&self, uid: &str) -> Result<Option<String>, StoreError>;
}
