// Approval Workflow Module
//
// Per-kind state tables, the role gate, the operator ledger and the generic
// orchestrator that sequences them, behind store traits so the engine runs
// the same against SQLite or memory.

pub mod engine;
pub mod errors;
pub mod items;
pub mod ledger;
pub mod memory;
pub mod permission;
pub mod roles;
pub mod sequence;
pub mod status;
pub mod tracker;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod mocks;


pub use engine::{ApprovalEngine, Collaborators, Decision, EngineSettings};
pub use errors::{StoreError, WorkflowError};
pub use items::{
    IssueService, ItemChanges, ItemDraft, RequirementService, RetrospectiveService, StoryService,
};
pub use ledger::{Ledger, Verdict};
pub use memory::InMemoryStore;
pub use permission::PermissionGate;
pub use roles::{Role, RoleSet};
pub use status::{
    IssueStatus, RequirementStatus, RetrospectiveStatus, StoryStatus, WorkflowStatus,
};
pub use tracker::{status_label, WorkflowTracker};
pub use traits::{GroupDirectory, RoleDirectory, WorkflowStore, WorkflowTx};
pub use types::{
    Audit, ItemDetails, ListQuery, OperatorRelation, Page, RelationType, RequirementType, WorkItem,
    WorkItemKind, WorkloadSummary,
};

#[cfg(any(test, feature = "testing"))]
pub use traits::{MockGroupDirectory, MockRoleDirectory};
