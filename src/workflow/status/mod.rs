// Compiled per-kind state tables
//
// Each work item kind owns a fixed directed graph of states. The engine is
// generic over `WorkflowStatus`, so the tables are the only thing that varies
// between kinds.

pub mod issue;
pub mod requirement;
pub mod retrospective;
pub mod story;

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use super::errors::WorkflowError;
use super::roles::Role;
use super::types::WorkItemKind;

pub use issue::IssueStatus;
pub use requirement::RequirementStatus;
pub use retrospective::RetrospectiveStatus;
pub use story::StoryStatus;

/// A state in one kind's workflow graph
pub trait WorkflowStatus:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = WorkflowError>
    + Send
    + Sync
    + 'static
{
    const KIND: WorkItemKind;
    const INITIAL: Self;
    const ALL: &'static [Self];

    /// Persisted name, e.g. `COUNTERSIGNING`
    fn name(self) -> &'static str;

    fn display_name(self) -> &'static str;

    /// Roles allowed to act while an item sits in this state. Empty for terminals.
    fn operable_roles(self) -> &'static [Role];

    fn approved(self) -> Self;

    fn rejected(self) -> Self;

    /// CANCELED from any open state; terminals stay put
    fn canceled(self) -> Self;

    fn is_terminal(self) -> bool;

    /// Every delegated operator must approve before the item moves on
    fn waiting_for_all_approvals(self) -> bool {
        false
    }

    fn is_modifiable(self) -> bool {
        !self.is_terminal()
    }

    fn terminal_names() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.name())
            .collect()
    }
}

/// Looks a persisted state name up in a kind's table
pub fn parse_status<S: WorkflowStatus>(name: &str) -> Result<S, WorkflowError> {
    let wanted = name.trim();
    S::ALL
        .iter()
        .copied()
        .find(|status| status.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| WorkflowError::InvalidEnum {
            field: "status",
            value: name.to_string(),
        })
}
