// Approval orchestrator
//
// One generic engine drives every work item kind; the per-kind state table
// supplies the graph and the operable roles. Every mutating request follows
// the same shape: read and check outside the transaction, then claim the row
// with a status compare-and-swap as the first write, apply the ledger and
// status changes, and commit.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, warn, Instrument, Span};

use super::errors::WorkflowError;
use super::ledger::{Ledger, Verdict};
use super::permission::PermissionGate;
use super::sequence::mint_code;
use super::status::{parse_status, WorkflowStatus};
use super::traits::{GroupDirectory, RoleDirectory, WorkflowStore, WorkflowTx};
use super::types::{
    Audit, ItemDetails, ItemFilter, ItemPatch, ListQuery, OperatorRelation, Page, SortField,
    WorkItem, WorkItemKind,
};
use crate::observability::{workflow_metrics, OperationTimer};
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// Paging limits for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// External capabilities shared by every engine
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn WorkflowStore>,
    pub roles: Arc<dyn RoleDirectory>,
    pub groups: Arc<dyn GroupDirectory>,
    pub settings: EngineSettings,
}

/// Outcome of approve, reject or cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<S> {
    pub code: String,
    pub from: S,
    pub to: S,
    /// False when a quorum state recorded the approval but is still waiting
    pub advanced: bool,
    /// Delegations still open at `from` after this decision
    pub pending: u64,
}

impl<S: fmt::Display> Decision<S> {
    pub fn named(&self) -> Decision<String> {
        Decision {
            code: self.code.clone(),
            from: self.from.to_string(),
            to: self.to.to_string(),
            advanced: self.advanced,
            pending: self.pending,
        }
    }
}

/// Validated input for a new work item
#[derive(Debug, Clone)]
pub(crate) struct NewItem {
    pub title: String,
    pub description: String,
    pub priority: Option<i32>,
    pub details: ItemDetails,
}

pub struct ApprovalEngine<S: WorkflowStatus> {
    ctx: Arc<Collaborators>,
    _status: PhantomData<S>,
}

impl<S: WorkflowStatus> Clone for ApprovalEngine<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            _status: PhantomData,
        }
    }
}

impl<S: WorkflowStatus> ApprovalEngine<S> {
    pub fn new(ctx: Arc<Collaborators>) -> Self {
        Self {
            ctx,
            _status: PhantomData,
        }
    }

    pub fn kind(&self) -> WorkItemKind {
        S::KIND
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.ctx
    }

    fn span(operation: &str, code: &str, actor: &str) -> Span {
        create_workflow_span(
            operation,
            S::KIND.as_str(),
            code,
            actor,
            &generate_correlation_id(),
        )
    }

    pub async fn query_by_code(&self, code: &str) -> Result<WorkItem, WorkflowError> {
        Ok(self.load(code).await?.0)
    }

    pub async fn status_of(&self, code: &str) -> Result<S, WorkflowError> {
        Ok(self.load(code).await?.1)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<WorkItem>, WorkflowError> {
        let settings = self.ctx.settings;
        let page_num = query.page_num.unwrap_or(1).max(1);
        let page_size = query
            .page_size
            .unwrap_or(settings.default_page_size)
            .clamp(1, settings.max_page_size.max(1));

        let mut filter = ItemFilter::new(S::KIND);
        filter.keywords = query
            .title
            .as_deref()
            .map(|title| title.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        filter.status = match query.status.as_deref().map(str::trim) {
            Some(status) if !status.is_empty() => {
                Some(parse_status::<S>(status)?.name().to_string())
            }
            _ => None,
        };
        filter.priority = query.priority;
        if let Some(order_by) = query.order_by.as_deref().filter(|s| !s.trim().is_empty()) {
            filter.sort = SortField::parse(order_by)?;
            filter.descending = false;
        }
        if let Some(dir) = query.order_dir.as_deref().filter(|s| !s.trim().is_empty()) {
            filter.descending = match dir.trim().to_ascii_lowercase().as_str() {
                "asc" => false,
                "desc" => true,
                _ => {
                    return Err(WorkflowError::InvalidEnum {
                        field: "order_dir",
                        value: dir.to_string(),
                    })
                }
            };
        }
        filter.offset = u64::from(page_num - 1) * u64::from(page_size);
        filter.limit = u64::from(page_size);

        let (total, items) = self.ctx.store.list_items(&filter).await?;
        debug!(kind = %S::KIND, total, returned = items.len(), "Listed work items");
        Ok(Page {
            page_num,
            page_size,
            total,
            items,
        })
    }

    /// Ledger rows for an item, oldest first
    pub async fn history(&self, code: &str) -> Result<Vec<OperatorRelation>, WorkflowError> {
        self.load(code).await?;
        Ok(self.ctx.store.relations_of(code).await?)
    }

    /// Record an approval. Advances immediately, or once every delegate has
    /// approved when the current state waits for all of them.
    pub async fn approve(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<S>, WorkflowError> {
        let span = Self::span("approve", code, actor);
        let timer = OperationTimer::new("workflow.approve");
        let result = self
            .approve_inner(code, next_operators, description, actor)
            .instrument(span)
            .await;
        timer.finish();
        observe("approve", code, actor, result)
    }

    async fn approve_inner(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<S>, WorkflowError> {
        let (_, current) = self.load_open(code).await?;
        self.authorize(actor, code, current).await?;
        let next = current.approved();
        let operators = self.check_operators(code, next_operators, next).await?;

        let mut tx = self.ctx.store.begin().await?;
        claim(&mut tx, code, current, actor).await?;

        let decision = if current.waiting_for_all_approvals() {
            let mut ledger = Ledger::new(&mut tx, code);
            ledger
                .resolve_once(current, actor, Verdict::Approved, next, description)
                .await?;
            let pending = ledger.count_pending(current).await?;
            if pending == 0 {
                advance(&mut tx, code, current, next, actor).await?;
                Ledger::new(&mut tx, code)
                    .delegate_all(next, &operators, actor)
                    .await?;
            }
            Decision {
                code: code.to_string(),
                from: current,
                to: if pending == 0 { next } else { current },
                advanced: pending == 0,
                pending,
            }
        } else {
            let mut ledger = Ledger::new(&mut tx, code);
            ledger
                .resolve(current, actor, Verdict::Approved, next, description)
                .await?;
            let ignored = ledger.ignore_remaining(current, next, actor).await?;
            debug!(code = %code, status = %current, ignored, "Closed remaining delegations");
            advance(&mut tx, code, current, next, actor).await?;
            Ledger::new(&mut tx, code)
                .delegate_all(next, &operators, actor)
                .await?;
            Decision {
                code: code.to_string(),
                from: current,
                to: next,
                advanced: true,
                pending: 0,
            }
        };
        tx.commit().await?;

        if decision.advanced {
            workflow_metrics().record_approval();
            info!(
                code = %code,
                from = %current,
                to = %next,
                actor = %actor,
                delegated = operators.len(),
                "Work item approved"
            );
        } else {
            workflow_metrics().record_partial_approval();
            info!(
                code = %code,
                status = %current,
                actor = %actor,
                pending = decision.pending,
                "Approval recorded, waiting for remaining approvers"
            );
        }
        Ok(decision)
    }

    /// Record a rejection. One rejection always redirects the item.
    pub async fn reject(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<S>, WorkflowError> {
        let span = Self::span("reject", code, actor);
        let timer = OperationTimer::new("workflow.reject");
        let result = self
            .reject_inner(code, next_operators, description, actor)
            .instrument(span)
            .await;
        timer.finish();
        observe("reject", code, actor, result)
    }

    async fn reject_inner(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<S>, WorkflowError> {
        let (_, current) = self.load_open(code).await?;
        self.authorize(actor, code, current).await?;
        let next = current.rejected();
        let operators = self.check_operators(code, next_operators, next).await?;

        let mut tx = self.ctx.store.begin().await?;
        claim(&mut tx, code, current, actor).await?;
        {
            let mut ledger = Ledger::new(&mut tx, code);
            ledger
                .resolve(current, actor, Verdict::Rejected, next, description)
                .await?;
            ledger.ignore_remaining(current, next, actor).await?;
        }
        advance(&mut tx, code, current, next, actor).await?;
        Ledger::new(&mut tx, code)
            .delegate_all(next, &operators, actor)
            .await?;
        tx.commit().await?;

        workflow_metrics().record_rejection();
        info!(code = %code, from = %current, to = %next, actor = %actor, "Work item rejected");
        Ok(Decision {
            code: code.to_string(),
            from: current,
            to: next,
            advanced: true,
            pending: 0,
        })
    }

    /// Move an open item to CANCELED and close its pending delegations.
    /// The canceler's row is filed as REJECTED with CANCELED as its new status.
    pub async fn cancel(
        &self,
        code: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Decision<S>, WorkflowError> {
        let span = Self::span("cancel", code, actor);
        let result: Result<Decision<S>, WorkflowError> = async {
            let (_, current) = self.load_open(code).await?;
            self.authorize(actor, code, current).await?;
            let next = current.canceled();

            let mut tx = self.ctx.store.begin().await?;
            claim(&mut tx, code, current, actor).await?;
            {
                let mut ledger = Ledger::new(&mut tx, code);
                ledger
                    .resolve(current, actor, Verdict::Rejected, next, reason)
                    .await?;
                ledger.ignore_remaining(current, next, actor).await?;
            }
            advance(&mut tx, code, current, next, actor).await?;
            tx.commit().await?;

            workflow_metrics().record_cancellation();
            info!(
                code = %code,
                from = %current,
                actor = %actor,
                reason = %reason,
                "Work item canceled"
            );
            Ok(Decision {
                code: code.to_string(),
                from: current,
                to: next,
                advanced: true,
                pending: 0,
            })
        }
        .instrument(span)
        .await;
        observe("cancel", code, actor, result)
    }

    /// Delegate `assignee` at the current status. Returns false when they
    /// already had a pending delegation.
    pub async fn assign(
        &self,
        code: &str,
        assignee: &str,
        actor: &str,
    ) -> Result<bool, WorkflowError> {
        let span = Self::span("assign", code, actor);
        let result: Result<bool, WorkflowError> = async {
            let (_, current) = self.load_open(code).await?;
            self.authorize(actor, code, current).await?;
            let assignee = assignee.trim();
            if assignee.is_empty() {
                return Err(WorkflowError::InvalidInput {
                    field: "assignee",
                    reason: "must not be blank".to_string(),
                });
            }
            if assignee != actor {
                let roles = self.ctx.roles.roles_of(assignee).await?;
                if !PermissionGate::can_act(&roles, current) {
                    return Err(WorkflowError::InvalidOperator {
                        uid: assignee.to_string(),
                        code: code.to_string(),
                        status: current.to_string(),
                    });
                }
            }

            let mut tx = self.ctx.store.begin().await?;
            claim(&mut tx, code, current, actor).await?;
            let delegated = Ledger::new(&mut tx, code)
                .delegate(current, assignee, actor)
                .await?;
            if !delegated {
                debug!(
                    code = %code,
                    assignee = %assignee,
                    "Assignee already pending, nothing written"
                );
                return Ok(false);
            }
            tx.commit().await?;

            workflow_metrics().record_assignment();
            info!(
                code = %code,
                status = %current,
                assignee = %assignee,
                actor = %actor,
                "Operator assigned"
            );
            Ok(true)
        }
        .instrument(span)
        .await;
        observe("assign", code, actor, result)
    }

    /// Withdraw `assignee`'s pending delegation at the current status.
    /// `Ok(false)` means there was nothing to withdraw.
    pub async fn unassign(
        &self,
        code: &str,
        assignee: &str,
        actor: &str,
    ) -> Result<bool, WorkflowError> {
        let span = Self::span("unassign", code, actor);
        let result: Result<bool, WorkflowError> = async {
            let (_, current) = self.load_open(code).await?;
            self.authorize(actor, code, current).await?;

            let mut tx = self.ctx.store.begin().await?;
            claim(&mut tx, code, current, actor).await?;
            let revoked = Ledger::new(&mut tx, code)
                .revoke_delegation(current, assignee.trim(), actor)
                .await?;
            if !revoked {
                info!(code = %code, assignee = %assignee, "No pending delegation to withdraw");
                return Ok(false);
            }
            tx.commit().await?;

            workflow_metrics().record_revocation();
            info!(
                code = %code,
                status = %current,
                assignee = %assignee,
                actor = %actor,
                "Operator unassigned"
            );
            Ok(true)
        }
        .instrument(span)
        .await;
        observe("unassign", code, actor, result)
    }

    pub(crate) async fn insert_new(
        &self,
        prefix: &str,
        new_item: NewItem,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        let span = Self::span("create", prefix, actor);
        let result: Result<WorkItem, WorkflowError> = async {
            let mut tx = self.ctx.store.begin().await?;
            let code = mint_code(&mut tx, prefix, actor).await?;
            let item = WorkItem {
                code,
                title: new_item.title,
                description: new_item.description,
                status: S::INITIAL.name().to_string(),
                priority: new_item.priority,
                details: new_item.details,
                audit: Audit::new(actor),
            };
            tx.insert_item(&item).await?;
            tx.commit().await?;

            workflow_metrics().record_creation();
            info!(
                code = %item.code,
                kind = %S::KIND,
                status = %S::INITIAL,
                actor = %actor,
                "Work item created"
            );
            Ok(item)
        }
        .instrument(span)
        .await;
        observe("create", prefix, actor, result)
    }

    pub(crate) async fn apply_update(
        &self,
        code: &str,
        patch: ItemPatch,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        let span = Self::span("update", code, actor);
        let result: Result<WorkItem, WorkflowError> = async {
            let (item, current) = self.load_open(code).await?;
            self.authorize(actor, code, current).await?;
            if patch.is_empty() {
                return Ok(item);
            }

            let mut tx = self.ctx.store.begin().await?;
            claim(&mut tx, code, current, actor).await?;
            tx.update_fields(code, &patch, actor).await?;
            tx.commit().await?;

            info!(code = %code, actor = %actor, "Work item updated");
            self.query_by_code(code).await
        }
        .instrument(span)
        .await;
        observe("update", code, actor, result)
    }

    async fn load(&self, code: &str) -> Result<(WorkItem, S), WorkflowError> {
        let item = self
            .ctx
            .store
            .find_item(code)
            .await?
            .filter(|item| item.kind() == S::KIND)
            .ok_or_else(|| WorkflowError::NotFound {
                kind: S::KIND,
                code: code.to_string(),
            })?;
        let status = parse_status::<S>(&item.status).map_err(|_| {
            super::errors::StoreError::Corrupt(format!(
                "{} {} has unknown status {}",
                S::KIND,
                item.code,
                item.status
            ))
        })?;
        Ok((item, status))
    }

    async fn load_open(&self, code: &str) -> Result<(WorkItem, S), WorkflowError> {
        let (item, status) = self.load(code).await?;
        if !status.is_modifiable() {
            return Err(WorkflowError::NotModifiable {
                code: code.to_string(),
                status: status.to_string(),
            });
        }
        Ok((item, status))
    }

    async fn authorize(&self, uid: &str, code: &str, state: S) -> Result<(), WorkflowError> {
        let roles = self.ctx.roles.roles_of(uid).await?;
        if PermissionGate::can_act(&roles, state) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                uid: uid.to_string(),
                code: code.to_string(),
                status: state.to_string(),
            })
        }
    }

    /// Every proposed delegate must be able to act at `next`. Nobody can be
    /// handed a terminal state.
    async fn check_operators(
        &self,
        code: &str,
        proposed: &[String],
        next: S,
    ) -> Result<Vec<String>, WorkflowError> {
        let mut seen = HashSet::new();
        let mut operators = Vec::with_capacity(proposed.len());
        for uid in proposed.iter().map(|uid| uid.trim()) {
            if uid.is_empty() {
                return Err(WorkflowError::InvalidInput {
                    field: "next_operators",
                    reason: "operator ids must not be blank".to_string(),
                });
            }
            if !seen.insert(uid) {
                continue;
            }
            let roles = self.ctx.roles.roles_of(uid).await?;
            if next.is_terminal() || !PermissionGate::can_act(&roles, next) {
                return Err(WorkflowError::InvalidOperator {
                    uid: uid.to_string(),
                    code: code.to_string(),
                    status: next.to_string(),
                });
            }
            operators.push(uid.to_string());
        }
        Ok(operators)
    }
}

/// First write of every mutating transaction: re-assert the status read
/// outside the transaction, taking the write lock on the row.
async fn claim<S: WorkflowStatus>(
    tx: &mut Box<dyn WorkflowTx>,
    code: &str,
    current: S,
    actor: &str,
) -> Result<(), WorkflowError> {
    advance(tx, code, current, current, actor).await
}

async fn advance<S: WorkflowStatus>(
    tx: &mut Box<dyn WorkflowTx>,
    code: &str,
    from: S,
    to: S,
    actor: &str,
) -> Result<(), WorkflowError> {
    if tx
        .compare_and_set_status(code, from.name(), to.name(), actor)
        .await?
    {
        Ok(())
    } else {
        Err(WorkflowError::Conflict {
            code: code.to_string(),
            expected: from.to_string(),
        })
    }
}

/// Log and count refused requests
fn observe<T>(
    operation: &str,
    code: &str,
    actor: &str,
    result: Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    if let Err(err) = &result {
        match err {
            WorkflowError::Conflict { .. } => workflow_metrics().record_conflict(),
            WorkflowError::Forbidden { .. } | WorkflowError::InvalidOperator { .. } => {
                workflow_metrics().record_denial()
            }
            _ => {}
        }
        warn!(
            operation = %operation,
            code = %code,
            actor = %actor,
            error.kind = err.kind(),
            "Workflow request refused: {err}"
        );
    }
    result
}
