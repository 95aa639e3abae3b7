// Core types for work items, the operator ledger and list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::errors::WorkflowError;

/// The four kinds of tracked work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemKind {
    Requirement,
    Story,
    Issue,
    Retrospective,
}

impl WorkItemKind {
    pub const ALL: &'static [WorkItemKind] = &[
        WorkItemKind::Requirement,
        WorkItemKind::Story,
        WorkItemKind::Issue,
        WorkItemKind::Retrospective,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemKind::Requirement => "REQUIREMENT",
            WorkItemKind::Story => "STORY",
            WorkItemKind::Issue => "ISSUE",
            WorkItemKind::Retrospective => "RETROSPECTIVE",
        }
    }

    /// Fixed code prefix, or `None` when the prefix depends on the author (stories)
    pub fn code_prefix(self) -> Option<&'static str> {
        match self {
            WorkItemKind::Requirement => Some("REQ"),
            WorkItemKind::Story => None,
            WorkItemKind::Issue => Some("BUG"),
            WorkItemKind::Retrospective => Some("RTS"),
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkItemKind::Requirement => "requirement",
            WorkItemKind::Story => "story",
            WorkItemKind::Issue => "issue",
            WorkItemKind::Retrospective => "retrospective",
        };
        f.write_str(name)
    }
}

impl FromStr for WorkItemKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requirement" | "req" => Ok(WorkItemKind::Requirement),
            "story" => Ok(WorkItemKind::Story),
            "issue" | "bug" => Ok(WorkItemKind::Issue),
            "retrospective" | "retro" | "rts" => Ok(WorkItemKind::Retrospective),
            _ => Err(WorkflowError::InvalidEnum {
                field: "kind",
                value: s.to_string(),
            }),
        }
    }
}

/// What a requirement asks the team to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementType {
    Building,
    Mod,
    Datapack,
    Modpack,
    Server,
    Efficiency,
    Reconstruction,
    Other,
}

impl RequirementType {
    pub const ALL: &'static [RequirementType] = &[
        RequirementType::Building,
        RequirementType::Mod,
        RequirementType::Datapack,
        RequirementType::Modpack,
        RequirementType::Server,
        RequirementType::Efficiency,
        RequirementType::Reconstruction,
        RequirementType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequirementType::Building => "BUILDING",
            RequirementType::Mod => "MOD",
            RequirementType::Datapack => "DATAPACK",
            RequirementType::Modpack => "MODPACK",
            RequirementType::Server => "SERVER",
            RequirementType::Efficiency => "EFFICIENCY",
            RequirementType::Reconstruction => "RECONSTRUCTION",
            RequirementType::Other => "OTHER",
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        RequirementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| WorkflowError::InvalidEnum {
                field: "requirement_type",
                value: s.to_string(),
            })
    }
}

/// Who created and last touched a record, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub fn new(actor: &str) -> Self {
        let now = Utc::now();
        Self {
            created_by: actor.to_string(),
            created_at: now,
            updated_by: actor.to_string(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }
}

/// Fields that only exist for one kind of work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemDetails {
    Requirement { requirement_type: RequirementType },
    Story { req_code: String },
    Issue,
    Retrospective,
}

impl ItemDetails {
    pub fn kind(&self) -> WorkItemKind {
        match self {
            ItemDetails::Requirement { .. } => WorkItemKind::Requirement,
            ItemDetails::Story { .. } => WorkItemKind::Story,
            ItemDetails::Issue => WorkItemKind::Issue,
            ItemDetails::Retrospective => WorkItemKind::Retrospective,
        }
    }

    pub fn requirement_type(&self) -> Option<RequirementType> {
        match self {
            ItemDetails::Requirement { requirement_type } => Some(*requirement_type),
            _ => None,
        }
    }

    pub fn req_code(&self) -> Option<&str> {
        match self {
            ItemDetails::Story { req_code } => Some(req_code),
            _ => None,
        }
    }
}

/// A requirement, story, issue or retrospective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub code: String,
    pub title: String,
    pub description: String,
    /// Name of the current state in the kind's state table
    pub status: String,
    pub priority: Option<i32>,
    pub details: ItemDetails,
    pub audit: Audit,
}

impl WorkItem {
    pub fn kind(&self) -> WorkItemKind {
        self.details.kind()
    }
}

/// Partial update of a work item's descriptive fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub requirement_type: Option<RequirementType>,
    pub req_code: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.requirement_type.is_none()
            && self.req_code.is_none()
    }

    pub fn apply_to(&self, item: &mut WorkItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(priority) = self.priority {
            item.priority = Some(priority);
        }
        match &mut item.details {
            ItemDetails::Requirement { requirement_type } => {
                if let Some(new_type) = self.requirement_type {
                    *requirement_type = new_type;
                }
            }
            ItemDetails::Story { req_code } => {
                if let Some(new_code) = &self.req_code {
                    *req_code = new_code.clone();
                }
            }
            ItemDetails::Issue | ItemDetails::Retrospective => {}
        }
    }
}

/// Lifecycle of one delegation row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// Delegated and still expected to act
    Handling,
    Approved,
    Rejected,
    /// Revoked by an assigner before it was acted on
    Withdrawn,
    /// Made moot by somebody else's decision
    Ignored,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Handling => "HANDLING",
            RelationType::Approved => "APPROVED",
            RelationType::Rejected => "REJECTED",
            RelationType::Withdrawn => "WITHDRAWN",
            RelationType::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HANDLING" => Ok(RelationType::Handling),
            "APPROVED" => Ok(RelationType::Approved),
            "REJECTED" => Ok(RelationType::Rejected),
            "WITHDRAWN" => Ok(RelationType::Withdrawn),
            "IGNORED" => Ok(RelationType::Ignored),
            other => Err(WorkflowError::InvalidEnum {
                field: "relation_type",
                value: other.to_string(),
            }),
        }
    }
}

/// One ledger row: `uid` was asked to act on `code` while it was `old_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRelation {
    pub id: i64,
    pub code: String,
    pub uid: String,
    pub relation_type: RelationType,
    pub old_status: String,
    pub new_status: Option<String>,
    pub description: Option<String>,
    pub audit: Audit,
}

impl OperatorRelation {
    pub fn is_pending(&self) -> bool {
        self.relation_type == RelationType::Handling
    }
}

/// Columns a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Code,
    Title,
    Status,
    Priority,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Code => "code",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    /// Accepts either `createdAt` or `created_at`
    pub fn parse(name: &str) -> Result<Self, WorkflowError> {
        match camel_to_snake(name.trim()).as_str() {
            "code" => Ok(SortField::Code),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            _ => Err(WorkflowError::InvalidEnum {
                field: "order_by",
                value: name.to_string(),
            }),
        }
    }

    /// Ascending comparison, ties broken by code
    pub fn compare(self, a: &WorkItem, b: &WorkItem) -> Ordering {
        let primary = match self {
            SortField::Code => Ordering::Equal,
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::CreatedAt => a.audit.created_at.cmp(&b.audit.created_at),
            SortField::UpdatedAt => a.audit.updated_at.cmp(&b.audit.updated_at),
        };
        primary.then_with(|| a.code.cmp(&b.code))
    }
}

pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Listing request as a caller sends it
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Whitespace separated keywords, all of which must appear in the title
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    /// 1-based
    pub page_num: Option<u32>,
    pub page_size: Option<u32>,
    pub order_by: Option<String>,
    /// `asc` or `desc`
    pub order_dir: Option<String>,
}

/// Case-folded form of a title or keyword. Keyword matching compares these.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Validated listing request handed to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub kind: WorkItemKind,
    pub keywords: Vec<String>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    pub sort: SortField,
    pub descending: bool,
    pub offset: u64,
    pub limit: u64,
}

impl ItemFilter {
    pub fn new(kind: WorkItemKind) -> Self {
        Self {
            kind,
            keywords: Vec::new(),
            status: None,
            priority: None,
            sort: SortField::default(),
            descending: true,
            offset: 0,
            limit: u64::MAX,
        }
    }

    /// Filter predicate shared by stores that filter in process
    pub fn matches(&self, item: &WorkItem) -> bool {
        if item.kind() != self.kind {
            return false;
        }
        if let Some(status) = &self.status {
            if &item.status != status {
                return false;
            }
        }
        if self.priority.is_some() && item.priority != self.priority {
            return false;
        }
        let title = search_key(&item.title);
        self.keywords
            .iter()
            .all(|keyword| title.contains(&search_key(keyword)))
    }

    pub fn ordering(&self, a: &WorkItem, b: &WorkItem) -> Ordering {
        let ord = self.sort.compare(a, b);
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// One page of results plus the unpaged total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Dashboard numbers for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadSummary {
    pub uid: String,
    /// Delegations still waiting on this user
    pub assigned: u64,
    /// Work items of any kind that have not reached a terminal state
    pub open: u64,
}
