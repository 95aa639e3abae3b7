// Role-based authorization against the state a work item is in

use super::roles::{Role, RoleSet};
use super::status::WorkflowStatus;

/// Decides whether a user may act on an item in a given state
pub struct PermissionGate;

impl PermissionGate {
    /// SUPER_ADMIN, or any overlap with the state's operable roles
    pub fn can_act<S: WorkflowStatus>(roles: &RoleSet, state: S) -> bool {
        Self::can_act_on(roles, state.operable_roles())
    }

    pub fn can_act_on(roles: &RoleSet, operable: &[Role]) -> bool {
        roles.is_super_admin() || roles.intersects(operable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::status::{RequirementStatus, RetrospectiveStatus};

    #[test]
    fn test_super_admin_bypasses_every_open_state() {
        let admin = RoleSet::from([Role::SuperAdmin]);
        for &state in RequirementStatus::ALL {
            assert!(PermissionGate::can_act(&admin, state));
        }
    }

    #[test]
    fn test_role_overlap_is_required() {
        let business = RoleSet::from([Role::Business]);
        let developer = RoleSet::from([Role::Development]);

        assert!(PermissionGate::can_act(
            &business,
            RequirementStatus::Reviewing,
        ));
        assert!(!PermissionGate::can_act(
            &developer,
            RequirementStatus::Reviewing,
        ));
        assert!(!PermissionGate::can_act(
            &developer,
            RequirementStatus::Countersigning,
        ));
        assert!(PermissionGate::can_act(
            &developer,
            RequirementStatus::Developing,
        ));
        assert!(!PermissionGate::can_act(
            &RoleSet::new(),
            RetrospectiveStatus::Ready,
        ));
    }

    #[test]
    fn test_nobody_but_admin_acts_on_terminals() {
        let everyone: RoleSet = Role::TEAM.iter().copied().collect();
        assert!(!PermissionGate::can_act(
            &everyone,
            RequirementStatus::Released,
        ));
        assert!(!PermissionGate::can_act(
            &everyone,
            RetrospectiveStatus::Canceled,
        ));
    }
}
