use std::fmt;
use std::str::FromStr;

use super::{parse_status, WorkflowStatus};
use crate::workflow::errors::WorkflowError;
use crate::workflow::roles::Role;
use crate::workflow::types::WorkItemKind;

/// Story lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoryStatus {
    Draft,
    Progressing,
    Testing,
    Finished,
    Rejected,
    Canceled,
}

impl WorkflowStatus for StoryStatus {
    const KIND: WorkItemKind = WorkItemKind::Story;
    const INITIAL: Self = StoryStatus::Draft;
    const ALL: &'static [Self] = &[
        StoryStatus::Draft,
        StoryStatus::Progressing,
        StoryStatus::Testing,
        StoryStatus::Finished,
        StoryStatus::Rejected,
        StoryStatus::Canceled,
    ];

    fn name(self) -> &'static str {
        match self {
            StoryStatus::Draft => "DRAFT",
            StoryStatus::Progressing => "PROGRESSING",
            StoryStatus::Testing => "TESTING",
            StoryStatus::Finished => "FINISHED",
            StoryStatus::Rejected => "REJECTED",
            StoryStatus::Canceled => "CANCELED",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            StoryStatus::Draft => "Draft",
            StoryStatus::Progressing => "In progress",
            StoryStatus::Testing => "Testing",
            StoryStatus::Finished => "Finished",
            StoryStatus::Rejected => "Rejected",
            StoryStatus::Canceled => "Canceled",
        }
    }

    fn operable_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            StoryStatus::Draft => &[Development, Architecture, Art, Model, Building],
            StoryStatus::Progressing => &[Development, Art, Model, Building],
            StoryStatus::Testing => &[Test],
            StoryStatus::Finished | StoryStatus::Rejected | StoryStatus::Canceled => &[],
        }
    }

    fn approved(self) -> Self {
        match self {
            StoryStatus::Draft => StoryStatus::Progressing,
            StoryStatus::Progressing => StoryStatus::Testing,
            StoryStatus::Testing => StoryStatus::Finished,
            terminal => terminal,
        }
    }

    fn rejected(self) -> Self {
        match self {
            StoryStatus::Draft | StoryStatus::Progressing => StoryStatus::Rejected,
            StoryStatus::Testing => StoryStatus::Progressing,
            terminal => terminal,
        }
    }

    fn canceled(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            StoryStatus::Canceled
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            StoryStatus::Finished | StoryStatus::Rejected | StoryStatus::Canceled
        )
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StoryStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}
