use std::fmt;
use std::str::FromStr;

use super::{parse_status, WorkflowStatus};
use crate::workflow::errors::WorkflowError;
use crate::workflow::roles::Role;
use crate::workflow::types::WorkItemKind;

/// Requirement lifecycle, from business review through release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementStatus {
    Reviewing,
    Countersigning,
    RequirementAnalysis,
    RequirementReviewing,
    Designing,
    Scheduling,
    Developing,
    Testing,
    Checking,
    Released,
    Rejected,
    Canceled,
}

impl WorkflowStatus for RequirementStatus {
    const KIND: WorkItemKind = WorkItemKind::Requirement;
    const INITIAL: Self = RequirementStatus::Reviewing;
    const ALL: &'static [Self] = &[
        RequirementStatus::Reviewing,
        RequirementStatus::Countersigning,
        RequirementStatus::RequirementAnalysis,
        RequirementStatus::RequirementReviewing,
        RequirementStatus::Designing,
        RequirementStatus::Scheduling,
        RequirementStatus::Developing,
        RequirementStatus::Testing,
        RequirementStatus::Checking,
        RequirementStatus::Released,
        RequirementStatus::Rejected,
        RequirementStatus::Canceled,
    ];

    fn name(self) -> &'static str {
        match self {
            RequirementStatus::Reviewing => "REVIEWING",
            RequirementStatus::Countersigning => "COUNTERSIGNING",
            RequirementStatus::RequirementAnalysis => "REQUIREMENT_ANALYSIS",
            RequirementStatus::RequirementReviewing => "REQUIREMENT_REVIEWING",
            RequirementStatus::Designing => "DESIGNING",
            RequirementStatus::Scheduling => "SCHEDULING",
            RequirementStatus::Developing => "DEVELOPING",
            RequirementStatus::Testing => "TESTING",
            RequirementStatus::Checking => "CHECKING",
            RequirementStatus::Released => "RELEASED",
            RequirementStatus::Rejected => "REJECTED",
            RequirementStatus::Canceled => "CANCELED",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            RequirementStatus::Reviewing => "Under review",
            RequirementStatus::Countersigning => "Countersigning",
            RequirementStatus::RequirementAnalysis => "Requirement analysis",
            RequirementStatus::RequirementReviewing => "Requirement review",
            RequirementStatus::Designing => "Designing",
            RequirementStatus::Scheduling => "Scheduling",
            RequirementStatus::Developing => "In development",
            RequirementStatus::Testing => "Testing",
            RequirementStatus::Checking => "Acceptance check",
            RequirementStatus::Released => "Released",
            RequirementStatus::Rejected => "Rejected",
            RequirementStatus::Canceled => "Canceled",
        }
    }

    fn operable_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            RequirementStatus::Reviewing => &[Business, Diagnosis],
            RequirementStatus::Countersigning => &[Product, Security, Art, Model, Building],
            RequirementStatus::RequirementAnalysis => &[Product],
            RequirementStatus::RequirementReviewing => &[Development, Test, Art, Model, Building],
            RequirementStatus::Designing => &[Architecture],
            RequirementStatus::Scheduling => &[Product],
            RequirementStatus::Developing => &[Development, Art, Model, Building],
            RequirementStatus::Testing => &[Test],
            RequirementStatus::Checking => &[Business],
            RequirementStatus::Released
            | RequirementStatus::Rejected
            | RequirementStatus::Canceled => &[],
        }
    }

    fn approved(self) -> Self {
        match self {
            RequirementStatus::Reviewing => RequirementStatus::Countersigning,
            RequirementStatus::Countersigning => RequirementStatus::RequirementAnalysis,
            RequirementStatus::RequirementAnalysis => RequirementStatus::RequirementReviewing,
            RequirementStatus::RequirementReviewing => RequirementStatus::Designing,
            RequirementStatus::Designing => RequirementStatus::Scheduling,
            RequirementStatus::Scheduling => RequirementStatus::Developing,
            RequirementStatus::Developing => RequirementStatus::Testing,
            RequirementStatus::Testing => RequirementStatus::Checking,
            RequirementStatus::Checking => RequirementStatus::Released,
            terminal => terminal,
        }
    }

    fn rejected(self) -> Self {
        match self {
            RequirementStatus::Reviewing
            | RequirementStatus::Countersigning
            | RequirementStatus::RequirementAnalysis
            | RequirementStatus::Scheduling => RequirementStatus::Rejected,
            RequirementStatus::RequirementReviewing | RequirementStatus::Designing => {
                RequirementStatus::RequirementAnalysis
            }
            RequirementStatus::Developing => RequirementStatus::Scheduling,
            RequirementStatus::Testing | RequirementStatus::Checking => {
                RequirementStatus::Developing
            }
            terminal => terminal,
        }
    }

    fn canceled(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            RequirementStatus::Canceled
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            RequirementStatus::Released | RequirementStatus::Rejected | RequirementStatus::Canceled
        )
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RequirementStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}
