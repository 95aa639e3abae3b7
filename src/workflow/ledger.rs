// Operator relation ledger
//
// Typed view over one transaction's ledger rows for a single work item. A row
// starts HANDLING when somebody is delegated at a state and is closed exactly
// once: APPROVED/REJECTED by its owner, WITHDRAWN by an assigner, or IGNORED
// when another decision moves the item on.

use tracing::debug;

use super::errors::StoreError;
use super::status::WorkflowStatus;
use super::traits::{NewRelation, RelationUpdate, WorkflowTx};
use super::types::{OperatorRelation, RelationType};

/// The two decisions an operator can record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl From<Verdict> for RelationType {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => RelationType::Approved,
            Verdict::Rejected => RelationType::Rejected,
        }
    }
}

pub struct Ledger<'t> {
    tx: &'t mut Box<dyn WorkflowTx>,
    code: &'t str,
}

fn rationale(description: &str) -> Option<String> {
    let trimmed = description.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn decision<S: WorkflowStatus>(
    actor: &str,
    verdict: Verdict,
    next: S,
    description: &str,
) -> RelationUpdate {
    RelationUpdate {
        relation_type: verdict.into(),
        new_status: Some(next.name().to_string()),
        description: rationale(description),
        actor: actor.to_string(),
    }
}

impl<'t> Ledger<'t> {
    pub fn new(tx: &'t mut Box<dyn WorkflowTx>, code: &'t str) -> Self {
        Self { tx, code }
    }

    /// Ask `operator` to act at `state`. Returns false when they already have a pending row there.
    pub async fn delegate<S: WorkflowStatus>(
        &mut self,
        state: S,
        operator: &str,
        actor: &str,
    ) -> Result<bool, StoreError> {
        let existing = self
            .tx
            .pending_relations(self.code, state.name(), Some(operator))
            .await?;
        if !existing.is_empty() {
            debug!(
                code = %self.code,
                status = %state,
                operator = %operator,
                "Delegation already pending"
            );
            return Ok(false);
        }

        self.tx
            .insert_relation(&NewRelation {
                code: self.code.to_string(),
                uid: operator.to_string(),
                relation_type: RelationType::Handling,
                old_status: state.name().to_string(),
                new_status: None,
                description: None,
                actor: actor.to_string(),
            })
            .await?;
        Ok(true)
    }

    /// Returns how many new rows were written
    pub async fn delegate_all<S: WorkflowStatus>(
        &mut self,
        state: S,
        operators: &[String],
        actor: &str,
    ) -> Result<usize, StoreError> {
        let mut written = 0;
        for operator in operators {
            if self.delegate(state, operator, actor).await? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// `true` when a pending delegation was found and withdrawn
    pub async fn revoke_delegation<S: WorkflowStatus>(
        &mut self,
        state: S,
        operator: &str,
        actor: &str,
    ) -> Result<bool, StoreError> {
        let update = RelationUpdate {
            relation_type: RelationType::Withdrawn,
            new_status: None,
            description: None,
            actor: actor.to_string(),
        };
        let changed = self
            .tx
            .close_pending(self.code, state.name(), Some(operator), &update)
            .await?;
        Ok(changed > 0)
    }

    /// Record `actor`'s decision at `state`. If they were never delegated, a
    /// closed row is written so the decision is still on file.
    pub async fn resolve<S: WorkflowStatus>(
        &mut self,
        state: S,
        actor: &str,
        verdict: Verdict,
        next: S,
        description: &str,
    ) -> Result<(), StoreError> {
        let update = decision(actor, verdict, next, description);
        if self.close_own(state, actor, &update).await? == 0 {
            self.file_closed(state, actor, update).await?;
        }
        Ok(())
    }

    /// Like `resolve`, for states that stay put until every delegate has
    /// decided: a repeated decision with nothing pending is not filed again.
    /// Returns false when nothing was written.
    pub async fn resolve_once<S: WorkflowStatus>(
        &mut self,
        state: S,
        actor: &str,
        verdict: Verdict,
        next: S,
        description: &str,
    ) -> Result<bool, StoreError> {
        let update = decision(actor, verdict, next, description);
        if self.close_own(state, actor, &update).await? > 0 {
            return Ok(true);
        }
        let earlier = self
            .tx
            .count_decided(self.code, state.name(), actor, update.relation_type)
            .await?;
        if earlier > 0 {
            debug!(code = %self.code, status = %state, actor = %actor, "Decision already on file");
            return Ok(false);
        }
        self.file_closed(state, actor, update).await?;
        Ok(true)
    }

    async fn close_own<S: WorkflowStatus>(
        &mut self,
        state: S,
        actor: &str,
        update: &RelationUpdate,
    ) -> Result<u64, StoreError> {
        self.tx
            .close_pending(self.code, state.name(), Some(actor), update)
            .await
    }

    async fn file_closed<S: WorkflowStatus>(
        &mut self,
        state: S,
        actor: &str,
        update: RelationUpdate,
    ) -> Result<(), StoreError> {
        self.tx
            .insert_relation(&NewRelation {
                code: self.code.to_string(),
                uid: actor.to_string(),
                relation_type: update.relation_type,
                old_status: state.name().to_string(),
                new_status: update.new_status,
                description: update.description,
                actor: actor.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Mark every still-pending row at `state` IGNORED
    pub async fn ignore_remaining<S: WorkflowStatus>(
        &mut self,
        state: S,
        next: S,
        actor: &str,
    ) -> Result<u64, StoreError> {
        let update = RelationUpdate {
            relation_type: RelationType::Ignored,
            new_status: Some(next.name().to_string()),
            description: None,
            actor: actor.to_string(),
        };
        self
            .tx
            .close_pending(self.code, state.name(), None, &update)
            .await
    }

    pub async fn count_pending<S: WorkflowStatus>(&mut self, state: S) -> Result<u64, StoreError> {
        self.tx.count_pending(self.code, state.name()).await
    }

    pub async fn list_pending<S: WorkflowStatus>(
        &mut self,
        state: S,
    ) -> Result<Vec<OperatorRelation>, StoreError> {
        self
            .tx
            .pending_relations(self.code, state.name(), None)
            .await
    }
}
