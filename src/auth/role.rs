//! Role hierarchy and permission derivation
//!
//! Roles form a fixed, closed set with an inheritance relation. The
//! registry holds each role's directly granted permissions plus the
//! roles it inherits from, and derives the effective permission set
//! as the union over the transitive closure of that relation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::error::{AideError, Result};

/// Assistant-wide user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
            Role::Guest => "guest",
        };
        f.write_str(name)
    }
}

/// Atomic capabilities that gate individual endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // User management
    ManageUsers,
    ViewUsers,
    // Plugin management
    ManagePlugins,
    UsePlugins,
    // System management
    ManageSystem,
    ViewSystem,
    // Data access
    ReadData,
    WriteData,
    DeleteData,
    // Feature access
    UseAi,
    UseVoice,
    UseFace,
    UseAutomation,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ManageUsers => "manage_users",
            Permission::ViewUsers => "view_users",
            Permission::ManagePlugins => "manage_plugins",
            Permission::UsePlugins => "use_plugins",
            Permission::ManageSystem => "manage_system",
            Permission::ViewSystem => "view_system",
            Permission::ReadData => "read_data",
            Permission::WriteData => "write_data",
            Permission::DeleteData => "delete_data",
            Permission::UseAi => "use_ai",
            Permission::UseVoice => "use_voice",
            Permission::UseFace => "use_face",
            Permission::UseAutomation => "use_automation",
        };
        f.write_str(name)
    }
}

/// Direct grants and inheritance edges for a single role
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub permissions: Vec<Permission>,
    pub inherits: Vec<Role>,
}

/// Immutable role table, constructed once at process start and shared
/// without synchronization
#[derive(Debug)]
pub struct RoleRegistry {
    definitions: HashMap<Role, RoleDefinition>,
}

impl RoleRegistry {
    /// Builds a registry from explicit definitions, rejecting tables
    /// whose inheritance edges reference undefined roles or form a cycle.
    pub fn new(definitions: HashMap<Role, RoleDefinition>) -> Result<Self> {
        let registry = Self { definitions };
        registry.validate()?;
        Ok(registry)
    }

    /// The built-in role hierarchy: admin > manager > user > guest.
    pub fn builtin() -> Self {
        let mut definitions = HashMap::new();
        definitions.insert(
            Role::Admin,
            RoleDefinition {
                permissions: vec![
                    Permission::ManageUsers,
                    Permission::ManagePlugins,
                    Permission::ManageSystem,
                ],
                inherits: vec![Role::Manager, Role::User, Role::Guest],
            },
        );
        definitions.insert(
            Role::Manager,
            RoleDefinition {
                permissions: vec![
                    Permission::ViewUsers,
                    Permission::UsePlugins,
                    Permission::ViewSystem,
                ],
                inherits: vec![Role::User, Role::Guest],
            },
        );
        definitions.insert(
            Role::User,
            RoleDefinition {
                permissions: vec![
                    Permission::UseAi,
                    Permission::UseVoice,
                    Permission::UseFace,
                    Permission::UseAutomation,
                ],
                inherits: vec![Role::Guest],
            },
        );
        definitions.insert(
            Role::Guest,
            RoleDefinition {
                permissions: vec![Permission::ReadData],
                inherits: vec![],
            },
        );

        // The table above is a constant; a cycle here is a programming
        // error caught before any request is served.
        Self::new(definitions).expect("built-in role hierarchy is acyclic")
    }

    /// Permissions granted directly to a role, excluding inherited ones
    pub fn direct_permissions(&self, role: Role) -> &[Permission] {
        self.definitions
            .get(&role)
            .map(|def| def.permissions.as_slice())
            .unwrap_or(&[])
    }

    /// Roles a role inherits from directly
    pub fn inherited(&self, role: Role) -> &[Role] {
        self.definitions
            .get(&role)
            .map(|def| def.inherits.as_slice())
            .unwrap_or(&[])
    }

    /// Computes the effective permission set for a set of roles: the
    /// union of direct permissions over every role reachable through
    /// inheritance. Deterministic and order-independent; the visited
    /// set bounds traversal even on a malformed graph.
    pub fn resolve(&self, roles: &[Role]) -> Vec<Permission> {
        let mut visited: HashSet<Role> = HashSet::new();
        let mut pending: Vec<Role> = roles.to_vec();
        let mut permissions: BTreeSet<Permission> = BTreeSet::new();

        while let Some(role) = pending.pop() {
            if !visited.insert(role) {
                continue;
            }
            if let Some(def) = self.definitions.get(&role) {
                permissions.extend(def.permissions.iter().copied());
                pending.extend(def.inherits.iter().copied());
            }
        }

        permissions.into_iter().collect()
    }

    /// Checks that every inheritance edge targets a defined role and
    /// that the edges form a DAG.
    fn validate(&self) -> Result<()> {
        for (&role, def) in &self.definitions {
            for &parent in &def.inherits {
                if !self.definitions.contains_key(&parent) {
                    return Err(AideError::ConfigError(format!(
                        "role {} inherits undefined role {}",
                        role, parent
                    )));
                }
            }
        }

        let mut marks: HashMap<Role, Mark> = HashMap::new();
        for &role in self.definitions.keys() {
            self.visit(role, &mut marks)?;
        }
        Ok(())
    }

    fn visit(&self, role: Role, marks: &mut HashMap<Role, Mark>) -> Result<()> {
        match marks.get(&role) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                return Err(AideError::ConfigError(format!(
                    "role inheritance cycle through {}",
                    role
                )));
            }
            None => {}
        }

        marks.insert(role, Mark::InProgress);
        if let Some(def) = self.definitions.get(&role) {
            for &parent in &def.inherits {
                self.visit(parent, marks)?;
            }
        }
        marks.insert(role, Mark::Done);
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}
