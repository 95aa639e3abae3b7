// Team roles and role sets consumed by the permission gate

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::errors::WorkflowError;

/// A role a user can hold on the team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Business,
    Product,
    Security,
    Architecture,
    Development,
    Test,
    Operation,
    Art,
    Model,
    Building,
    Diagnosis,
    /// Bypasses every state-based authorization check
    SuperAdmin,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Business,
        Role::Product,
        Role::Security,
        Role::Architecture,
        Role::Development,
        Role::Test,
        Role::Operation,
        Role::Art,
        Role::Model,
        Role::Building,
        Role::Diagnosis,
        Role::SuperAdmin,
    ];

    /// Every role that does actual work on the team
    pub const TEAM: &'static [Role] = &[
        Role::Business,
        Role::Product,
        Role::Security,
        Role::Architecture,
        Role::Development,
        Role::Test,
        Role::Operation,
        Role::Art,
        Role::Model,
        Role::Building,
        Role::Diagnosis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Business => "BUSINESS",
            Role::Product => "PRODUCT",
            Role::Security => "SECURITY",
            Role::Architecture => "ARCHITECTURE",
            Role::Development => "DEVELOPMENT",
            Role::Test => "TEST",
            Role::Operation => "OPERATION",
            Role::Art => "ART",
            Role::Model => "MODEL",
            Role::Building => "BUILDING",
            Role::Diagnosis => "DIAGNOSIS",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| WorkflowError::InvalidEnum {
                field: "role",
                value: s.to_string(),
            })
    }
}

/// The roles held by a single user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.contains(Role::SuperAdmin)
    }

    /// True when at least one of `roles` is held
    pub fn intersects(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.0.contains(role))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(" Product ".parse::<Role>().unwrap(), Role::Product);
        assert!(matches!(
            "JANITOR".parse::<Role>(),
            Err(WorkflowError::InvalidEnum { field: "role", .. })
        ));
    }

    #[test]
    fn test_role_set_intersection() {
        let roles = RoleSet::from([Role::Development, Role::Art]);
        assert!(roles.intersects(&[Role::Art, Role::Model]));
        assert!(!roles.intersects(&[Role::Test]));
        assert!(!roles.intersects(&[]));
        assert!(!roles.is_super_admin());
        assert_eq!(roles.to_string(), "[DEVELOPMENT, ART]");
    }
}
