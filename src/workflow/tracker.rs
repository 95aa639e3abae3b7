// Entry point bundling one engine per work item kind
//
// Callers that only hold a code (CLI, a REST layer) go through the tracker,
// which finds the item's kind and hands the request to the matching engine.

use std::sync::Arc;

use super::engine::{Collaborators, Decision, EngineSettings};
use super::errors::WorkflowError;
use super::items::{
    IssueService, ItemChanges, ItemDraft, RequirementService, RetrospectiveService, StoryService,
};
use super::sequence::parse_code;
use super::status::{
    parse_status, IssueStatus, RequirementStatus, RetrospectiveStatus, StoryStatus, WorkflowStatus,
};
use super::traits::{GroupDirectory, RoleDirectory, WorkflowStore};
use super::types::{ListQuery, OperatorRelation, Page, WorkItem, WorkItemKind, WorkloadSummary};

macro_rules! dispatch {
    ($tracker:expr, $kind:expr, $engine:ident => $body:expr) => {
        match $kind {
            WorkItemKind::Requirement => {
                let $engine = &$tracker.requirements;
                $body
            }
            WorkItemKind::Story => {
                let $engine = &$tracker.stories;
                $body
            }
            WorkItemKind::Issue => {
                let $engine = &$tracker.issues;
                $body
            }
            WorkItemKind::Retrospective => {
                let $engine = &$tracker.retrospectives;
                $body
            }
        }
    };
}

pub struct WorkflowTracker {
    ctx: Arc<Collaborators>,
    pub requirements: RequirementService,
    pub stories: StoryService,
    pub issues: IssueService,
    pub retrospectives: RetrospectiveService,
}

impl WorkflowTracker {
    /// One backend serving the store and both directories
    pub fn new<T>(backend: Arc<T>, settings: EngineSettings) -> Self
    where
        T: WorkflowStore + RoleDirectory + GroupDirectory + 'static,
    {
        Self::with_collaborators(Collaborators {
            store: backend.clone(),
            roles: backend.clone(),
            groups: backend,
            settings,
        })
    }

    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        let ctx = Arc::new(collaborators);
        Self {
            requirements: RequirementService::new(Arc::clone(&ctx)),
            stories: StoryService::new(Arc::clone(&ctx)),
            issues: IssueService::new(Arc::clone(&ctx)),
            retrospectives: RetrospectiveService::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    /// Find an item of any kind
    pub async fn locate(&self, code: &str) -> Result<WorkItem, WorkflowError> {
        self.ctx
            .store
            .find_item(code)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                kind: kind_from_code(code),
                code: code.to_string(),
            })
    }

    pub async fn create(
        &self,
        kind: WorkItemKind,
        draft: ItemDraft,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        dispatch!(self, kind, engine => engine.create(draft, actor).await)
    }

    pub async fn update(
        &self,
        code: &str,
        changes: ItemChanges,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine.update(code, changes, actor).await)
    }

    pub async fn list(
        &self,
        kind: WorkItemKind,
        query: &ListQuery,
    ) -> Result<Page<WorkItem>, WorkflowError> {
        dispatch!(self, kind, engine => engine.list(query).await)
    }

    pub async fn approve(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<String>, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine
            .approve(code, next_operators, description, actor)
            .await
            .map(|d| d.named()))
    }

    pub async fn reject(
        &self,
        code: &str,
        next_operators: &[String],
        description: &str,
        actor: &str,
    ) -> Result<Decision<String>, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine
            .reject(code, next_operators, description, actor)
            .await
            .map(|d| d.named()))
    }

    pub async fn cancel(
        &self,
        code: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Decision<String>, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine.cancel(code, reason, actor).await.map(|d| d.named()))
    }

    pub async fn assign(
        &self,
        code: &str,
        assignee: &str,
        actor: &str,
    ) -> Result<bool, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine.assign(code, assignee, actor).await)
    }

    pub async fn unassign(
        &self,
        code: &str,
        assignee: &str,
        actor: &str,
    ) -> Result<bool, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine.unassign(code, assignee, actor).await)
    }

    pub async fn history(&self, code: &str) -> Result<Vec<OperatorRelation>, WorkflowError> {
        let kind = self.locate(code).await?.kind();
        dispatch!(self, kind, engine => engine.history(code).await)
    }

    /// How many delegations wait on `uid`, and how much work is still open overall
    pub async fn summary(&self, uid: &str) -> Result<WorkloadSummary, WorkflowError> {
        let store = &self.ctx.store;
        let assigned = store.count_assigned(uid).await?;
        let mut open = 0;
        for kind in WorkItemKind::ALL {
            open += store.count_open(*kind, &terminal_names(*kind)).await?;
        }
        Ok(WorkloadSummary {
            uid: uid.to_string(),
            assigned,
            open,
        })
    }
}

fn terminal_names(kind: WorkItemKind) -> Vec<&'static str> {
    match kind {
        WorkItemKind::Requirement => RequirementStatus::terminal_names(),
        WorkItemKind::Story => StoryStatus::terminal_names(),
        WorkItemKind::Issue => IssueStatus::terminal_names(),
        WorkItemKind::Retrospective => RetrospectiveStatus::terminal_names(),
    }
}

/// Human readable label for a persisted status
pub fn status_label(kind: WorkItemKind, status: &str) -> Option<&'static str> {
    match kind {
        WorkItemKind::Requirement => label::<RequirementStatus>(status),
        WorkItemKind::Story => label::<StoryStatus>(status),
        WorkItemKind::Issue => label::<IssueStatus>(status),
        WorkItemKind::Retrospective => label::<RetrospectiveStatus>(status),
    }
}

fn label<S: WorkflowStatus>(status: &str) -> Option<&'static str> {
    parse_status::<S>(status).ok().map(|s| s.display_name())
}

/// Best guess at a kind from a code that could not be found
fn kind_from_code(code: &str) -> WorkItemKind {
    let prefix = parse_code(code).map_or(code, |(prefix, _)| prefix);
    WorkItemKind::ALL
        .iter()
        .copied()
        .find(|kind| kind.code_prefix() == Some(prefix))
        .unwrap_or(WorkItemKind::Story)
}
