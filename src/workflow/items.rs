// Per-kind creation and update rules on top of the generic engine

use serde::{Deserialize, Serialize};

use super::engine::{ApprovalEngine, NewItem};
use super::errors::WorkflowError;
use super::status::{
    IssueStatus, RequirementStatus, RetrospectiveStatus, StoryStatus, WorkflowStatus,
};
use super::types::{ItemDetails, ItemPatch, RequirementType, WorkItem, WorkItemKind};

pub type RequirementService = ApprovalEngine<RequirementStatus>;
pub type StoryService = ApprovalEngine<StoryStatus>;
pub type IssueService = ApprovalEngine<IssueStatus>;
pub type RetrospectiveService = ApprovalEngine<RetrospectiveStatus>;

/// Fields a caller supplies to create any kind of work item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<i32>,
    /// Requirements only
    pub requirement_type: Option<String>,
    /// Stories only
    pub req_code: Option<String>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn requirement_type(mut self, requirement_type: impl Into<String>) -> Self {
        self.requirement_type = Some(requirement_type.into());
        self
    }

    pub fn req_code(mut self, req_code: impl Into<String>) -> Self {
        self.req_code = Some(req_code.into());
        self
    }
}

/// Partial update as a caller sends it; `None` leaves a field alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub requirement_type: Option<String>,
    pub req_code: Option<String>,
}

fn checked_title(title: &str) -> Result<String, WorkflowError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(WorkflowError::InvalidInput {
            field: "title",
            reason: "must not be blank".to_string(),
        });
    }
    Ok(title.to_string())
}

fn checked_priority(priority: Option<i32>) -> Result<Option<i32>, WorkflowError> {
    match priority {
        Some(p) if p < 0 => Err(WorkflowError::InvalidInput {
            field: "priority",
            reason: format!("{p} is negative"),
        }),
        other => Ok(other),
    }
}

fn base_patch(changes: &ItemChanges) -> Result<ItemPatch, WorkflowError> {
    Ok(ItemPatch {
        title: changes.title.as_deref().map(checked_title).transpose()?,
        description: changes.description.clone(),
        priority: checked_priority(changes.priority)?,
        requirement_type: None,
        req_code: None,
    })
}

impl<S: WorkflowStatus> ApprovalEngine<S> {
    /// Refuse a field that belongs to another kind of work item
    fn not_applicable<T>(field: &'static str, value: &Option<T>) -> Result<(), WorkflowError> {
        if value.is_some() {
            return Err(WorkflowError::InvalidInput {
                field,
                reason: format!("does not apply to a {}", S::KIND),
            });
        }
        Ok(())
    }

    /// `code` must name an existing requirement
    async fn ensure_requirement(&self, code: &str) -> Result<String, WorkflowError> {
        let code = code.trim();
        match self.collaborators().store.find_item(code).await? {
            Some(item) if item.kind() == WorkItemKind::Requirement => Ok(item.code),
            _ => Err(WorkflowError::UnknownReference {
                code: code.to_string(),
            }),
        }
    }
}

impl ApprovalEngine<RequirementStatus> {
    pub async fn create(&self, draft: ItemDraft, actor: &str) -> Result<WorkItem, WorkflowError> {
        let title = checked_title(&draft.title)?;
        let priority = checked_priority(draft.priority)?;
        Self::not_applicable("req_code", &draft.req_code)?;
        let requirement_type: RequirementType = draft
            .requirement_type
            .as_deref()
            .unwrap_or_default()
            .parse()?;

        let new_item = NewItem {
            title,
            description: draft.description,
            priority,
            details: ItemDetails::Requirement { requirement_type },
        };
        self.insert_new("REQ", new_item, actor).await
    }

    pub async fn update(
        &self,
        code: &str,
        changes: ItemChanges,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        self.query_by_code(code).await?;
        Self::not_applicable("req_code", &changes.req_code)?;
        let mut patch = base_patch(&changes)?;
        patch.requirement_type = changes
            .requirement_type
            .as_deref()
            .map(str::parse::<RequirementType>)
            .transpose()?;
        self.apply_update(code, patch, actor).await
    }
}

impl ApprovalEngine<StoryStatus> {
    /// Story codes are prefixed with the author's group code
    pub async fn create(&self, draft: ItemDraft, actor: &str) -> Result<WorkItem, WorkflowError> {
        let title = checked_title(&draft.title)?;
        let priority = checked_priority(draft.priority)?;
        Self::not_applicable("requirement_type", &draft.requirement_type)?;
        let req_code = self
            .ensure_requirement(draft.req_code.as_deref().unwrap_or_default())
            .await?;
        let prefix = self
            .collaborators()
            .groups
            .group_of(actor)
            .await?
            .ok_or_else(|| WorkflowError::MissingGroup {
                uid: actor.to_string(),
            })?;

        let new_item = NewItem {
            title,
            description: draft.description,
            priority,
            details: ItemDetails::Story { req_code },
        };
        self.insert_new(&prefix, new_item, actor).await
    }

    pub async fn update(
        &self,
        code: &str,
        changes: ItemChanges,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        self.query_by_code(code).await?;
        Self::not_applicable("requirement_type", &changes.requirement_type)?;
        let mut patch = base_patch(&changes)?;
        if let Some(req_code) = changes.req_code.as_deref() {
            patch.req_code = Some(self.ensure_requirement(req_code).await?);
        }
        self.apply_update(code, patch, actor).await
    }
}

impl ApprovalEngine<IssueStatus> {
    pub async fn create(&self, draft: ItemDraft, actor: &str) -> Result<WorkItem, WorkflowError> {
        let title = checked_title(&draft.title)?;
        let priority = checked_priority(draft.priority)?;
        Self::not_applicable("requirement_type", &draft.requirement_type)?;
        Self::not_applicable("req_code", &draft.req_code)?;

        let new_item = NewItem {
            title,
            description: draft.description,
            priority,
            details: ItemDetails::Issue,
        };
        self.insert_new("BUG", new_item, actor).await
    }

    pub async fn update(
        &self,
        code: &str,
        changes: ItemChanges,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        self.query_by_code(code).await?;
        Self::not_applicable("requirement_type", &changes.requirement_type)?;
        Self::not_applicable("req_code", &changes.req_code)?;
        let patch = base_patch(&changes)?;
        self.apply_update(code, patch, actor).await
    }
}

impl ApprovalEngine<RetrospectiveStatus> {
    pub async fn create(&self, draft: ItemDraft, actor: &str) -> Result<WorkItem, WorkflowError> {
        let title = checked_title(&draft.title)?;
        let priority = checked_priority(draft.priority)?;
        Self::not_applicable("requirement_type", &draft.requirement_type)?;
        Self::not_applicable("req_code", &draft.req_code)?;

        let new_item = NewItem {
            title,
            description: draft.description,
            priority,
            details: ItemDetails::Retrospective,
        };
        self.insert_new("RTS", new_item, actor).await
    }

    pub async fn update(
        &self,
        code: &str,
        changes: ItemChanges,
        actor: &str,
    ) -> Result<WorkItem, WorkflowError> {
        self.query_by_code(code).await?;
        Self::not_applicable("requirement_type", &changes.requirement_type)?;
        Self::not_applicable("req_code", &changes.req_code)?;
        let patch = base_patch(&changes)?;
        self.apply_update(code, patch, actor).await
    }
}
