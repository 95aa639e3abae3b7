use std::fmt;
use std::str::FromStr;

use super::{parse_status, WorkflowStatus};
use crate::workflow::errors::WorkflowError;
use crate::workflow::roles::Role;
use crate::workflow::types::WorkItemKind;

/// Retrospective lifecycle. Linear: every participant signs off on READY,
/// then the action items are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrospectiveStatus {
    Ready,
    Handling,
    Finished,
    Canceled,
}

impl RetrospectiveStatus {
    /// The single forward edge of the graph
    pub fn next(self) -> Self {
        match self {
            RetrospectiveStatus::Ready => RetrospectiveStatus::Handling,
            RetrospectiveStatus::Handling => RetrospectiveStatus::Finished,
            terminal => terminal,
        }
    }
}

impl WorkflowStatus for RetrospectiveStatus {
    const KIND: WorkItemKind = WorkItemKind::Retrospective;
    const INITIAL: Self = RetrospectiveStatus::Ready;
    const ALL: &'static [Self] = &[
        RetrospectiveStatus::Ready,
        RetrospectiveStatus::Handling,
        RetrospectiveStatus::Finished,
        RetrospectiveStatus::Canceled,
    ];

    fn name(self) -> &'static str {
        match self {
            RetrospectiveStatus::Ready => "READY",
            RetrospectiveStatus::Handling => "HANDLING",
            RetrospectiveStatus::Finished => "FINISHED",
            RetrospectiveStatus::Canceled => "CANCELED",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            RetrospectiveStatus::Ready => "Awaiting sign-off",
            RetrospectiveStatus::Handling => "Handling action items",
            RetrospectiveStatus::Finished => "Finished",
            RetrospectiveStatus::Canceled => "Canceled",
        }
    }

    fn operable_roles(self) -> &'static [Role] {
        match self {
            RetrospectiveStatus::Ready | RetrospectiveStatus::Handling => Role::TEAM,
            RetrospectiveStatus::Finished | RetrospectiveStatus::Canceled => &[],
        }
    }

    fn approved(self) -> Self {
        self.next()
    }

    /// Turning a retrospective down ends it
    fn rejected(self) -> Self {
        self.canceled()
    }

    fn canceled(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            RetrospectiveStatus::Canceled
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            RetrospectiveStatus::Finished | RetrospectiveStatus::Canceled
        )
    }

    fn waiting_for_all_approvals(self) -> bool {
        self == RetrospectiveStatus::Ready
    }
}

impl fmt::Display for RetrospectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetrospectiveStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}
