use std::fmt;
use std::str::FromStr;

use super::{parse_status, WorkflowStatus};
use crate::workflow::errors::WorkflowError;
use crate::workflow::roles::Role;
use crate::workflow::types::WorkItemKind;

/// Defect lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueStatus {
    Reviewing,
    Confirming,
    Handling,
    Testing,
    Checking,
    Released,
    Rejected,
    Canceled,
}

impl WorkflowStatus for IssueStatus {
    const KIND: WorkItemKind = WorkItemKind::Issue;
    const INITIAL: Self = IssueStatus::Reviewing;
    const ALL: &'static [Self] = &[
        IssueStatus::Reviewing,
        IssueStatus::Confirming,
        IssueStatus::Handling,
        IssueStatus::Testing,
        IssueStatus::Checking,
        IssueStatus::Released,
        IssueStatus::Rejected,
        IssueStatus::Canceled,
    ];

    fn name(self) -> &'static str {
        match self {
            IssueStatus::Reviewing => "REVIEWING",
            IssueStatus::Confirming => "CONFIRMING",
            IssueStatus::Handling => "HANDLING",
            IssueStatus::Testing => "TESTING",
            IssueStatus::Checking => "CHECKING",
            IssueStatus::Released => "RELEASED",
            IssueStatus::Rejected => "REJECTED",
            IssueStatus::Canceled => "CANCELED",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            IssueStatus::Reviewing => "Under review",
            IssueStatus::Confirming => "Confirming",
            IssueStatus::Handling => "Being fixed",
            IssueStatus::Testing => "Testing",
            IssueStatus::Checking => "Acceptance check",
            IssueStatus::Released => "Released",
            IssueStatus::Rejected => "Rejected",
            IssueStatus::Canceled => "Canceled",
        }
    }

    fn operable_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            IssueStatus::Reviewing => &[Business, Diagnosis],
            IssueStatus::Confirming => &[Development, Test, Diagnosis],
            IssueStatus::Handling => &[Development, Art, Model, Building],
            IssueStatus::Testing => &[Test],
            IssueStatus::Checking => &[Business, Diagnosis],
            IssueStatus::Released | IssueStatus::Rejected | IssueStatus::Canceled => &[],
        }
    }

    fn approved(self) -> Self {
        match self {
            IssueStatus::Reviewing => IssueStatus::Confirming,
            IssueStatus::Confirming => IssueStatus::Handling,
            IssueStatus::Handling => IssueStatus::Testing,
            IssueStatus::Testing => IssueStatus::Checking,
            IssueStatus::Checking => IssueStatus::Released,
            terminal => terminal,
        }
    }

    fn rejected(self) -> Self {
        match self {
            IssueStatus::Reviewing | IssueStatus::Confirming => IssueStatus::Rejected,
            IssueStatus::Handling => IssueStatus::Confirming,
            IssueStatus::Testing | IssueStatus::Checking => IssueStatus::Handling,
            terminal => terminal,
        }
    }

    fn canceled(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            IssueStatus::Canceled
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            IssueStatus::Released | IssueStatus::Rejected | IssueStatus::Canceled
        )
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IssueStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}
