// In-process workflow store
//
// A transaction takes the store lock for its whole lifetime, works on a copy
// of the state and swaps it in on commit, so requests are serialized and an
// abandoned transaction leaves nothing behind.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::errors::StoreError;
use super::roles::{Role, RoleSet};
use super::traits::{
    GroupDirectory, NewRelation, RelationUpdate, RoleDirectory, WorkflowStore, WorkflowTx,
};
use super::types::{
    Audit, ItemFilter, ItemPatch, OperatorRelation, RelationType, WorkItem, WorkItemKind,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    items: BTreeMap<String, WorkItem>,
    relations: Vec<OperatorRelation>,
    counters: HashMap<String, i64>,
    roles: HashMap<String, RoleSet>,
    groups: HashMap<String, String>,
    last_relation_id: i64,
}

impl MemoryState {
    fn pending_mut<'a>(
        &'a mut self,
        code: &'a str,
        status: &'a str,
        uid: Option<&'a str>,
    ) -> impl Iterator<Item = &'a mut OperatorRelation> + 'a {
        self.relations.iter_mut().filter(move |r| {
            r.is_pending()
                && r.code == code
                && r.old_status == status
                && uid.map_or(true, |uid| r.uid == uid)
        })
    }
}

/// Workflow store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant_roles(&self, uid: &str, roles: &[Role]) {
        let mut state = self.state.lock().await;
        let entry = state.roles.entry(uid.to_string()).or_default();
        for role in roles {
            entry.insert(*role);
        }
    }

    pub async fn revoke_role(&self, uid: &str, role: Role) -> bool {
        let mut state = self.state.lock().await;
        state
            .roles
            .get_mut(uid)
            .is_some_and(|roles| roles.remove(role))
    }

    pub async fn set_group(&self, uid: &str, group_code: &str) {
        let mut state = self.state.lock().await;
        state.groups.insert(uid.to_string(), group_code.to_string());
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn find_item(&self, code: &str) -> Result<Option<WorkItem>, StoreError> {
        Ok(self.state.lock().await.items.get(code).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<(u64, Vec<WorkItem>), StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&WorkItem> = state
            .items
            .values()
            .filter(|item| filter.matches(item))
            .collect();
        matching.sort_by(|a, b| filter.ordering(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((total, page))
    }

    async fn relations_of(&self, code: &str) -> Result<Vec<OperatorRelation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .relations
            .iter()
            .filter(|r| r.code == code)
            .cloned()
            .collect())
    }

    async fn count_assigned(&self, uid: &str) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .relations
            .iter()
            .filter(|r| r.is_pending() && r.uid == uid)
            .count() as u64)
    }

    async fn count_open(
        &self,
        kind: WorkItemKind,
        terminal: &[&'static str],
    ) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|item| item.kind() == kind && !terminal.contains(&item.status.as_str()))
            .count() as u64)
    }
}

#[async_trait]
impl RoleDirectory for InMemoryStore {
    async fn roles_of(&self, uid: &str) -> Result<RoleSet, StoreError> {
        let state = self.state.lock().await;
        Ok(state.roles.get(uid).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GroupDirectory for InMemoryStore {
    async fn group_of(&self, uid: &str) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.groups.get(uid).cloned())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn next_sequence(&mut self, prefix: &str, _actor: &str) -> Result<i64, StoreError> {
        let value = self.staged.counters.entry(prefix.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn insert_item(&mut self, item: &WorkItem) -> Result<(), StoreError> {
        if self.staged.items.contains_key(&item.code) {
            return Err(StoreError::Corrupt(format!(
                "duplicate work item code {}",
                item.code
            )));
        }
        self.staged.items.insert(item.code.clone(), item.clone());
        Ok(())
    }

    async fn compare_and_set_status(
        &mut self,
        code: &str,
        expected: &str,
        new: &str,
        actor: &str,
    ) -> Result<bool, StoreError> {
        match self.staged.items.get_mut(code) {
            Some(item) if item.status == expected => {
                item.status = new.to_string();
                item.audit.touch(actor);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_fields(
        &mut self,
        code: &str,
        patch: &ItemPatch,
        actor: &str,
    ) -> Result<(), StoreError> {
        let item = self
            .staged
            .items
            .get_mut(code)
            .ok_or_else(|| StoreError::Corrupt(format!("work item {code} vanished mid-update")))?;
        patch.apply_to(item);
        item.audit.touch(actor);
        Ok(())
    }

    async fn insert_relation(&mut self, relation: &NewRelation) -> Result<i64, StoreError> {
        self.staged.last_relation_id += 1;
        let id = self.staged.last_relation_id;
        self.staged.relations.push(OperatorRelation {
            id,
            code: relation.code.clone(),
            uid: relation.uid.clone(),
            relation_type: relation.relation_type,
            old_status: relation.old_status.clone(),
            new_status: relation.new_status.clone(),
            description: relation.description.clone(),
            audit: Audit::new(&relation.actor),
        });
        Ok(id)
    }

    async fn pending_relations(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
    ) -> Result<Vec<OperatorRelation>, StoreError> {
        Ok(self
            .staged
            .pending_mut(code, status, uid)
            .map(|r| r.clone())
            .collect())
    }

    async fn count_pending(&mut self, code: &str, status: &str) -> Result<u64, StoreError> {
        Ok(self.staged.pending_mut(code, status, None).count() as u64)
    }

    async fn count_decided(
        &mut self,
        code: &str,
        status: &str,
        uid: &str,
        relation_type: RelationType,
    ) -> Result<u64, StoreError> {
        let decided = self
            .staged
            .relations
            .iter()
            .filter(|r| r.code == code && r.old_status == status)
            .filter(|r| r.uid == uid && r.relation_type == relation_type)
            .count();
        Ok(decided as u64)
    }

    async fn close_pending(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
        update: &RelationUpdate,
    ) -> Result<u64, StoreError> {
        let mut changed = 0;
        for relation in self.staged.pending_mut(code, status, uid) {
            relation.relation_type = update.relation_type;
            if update.new_status.is_some() {
                relation.new_status = update.new_status.clone();
            }
            if update.description.is_some() {
                relation.description = update.description.clone();
            }
            relation.audit.touch(&update.actor);
            changed += 1;
        }
        Ok(changed)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
