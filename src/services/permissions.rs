use std::collections::{HashMap, HashSet};
use std::fmt;

/// Capabilities checked before an admin operation executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AuditView,
    AuditExport,
    AllowlistView,
    AllowlistManage,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::AuditView,
        Permission::AuditExport,
        Permission::AllowlistView,
        Permission::AllowlistManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AuditView => "audit:view",
            Permission::AuditExport => "audit:export",
            Permission::AllowlistView => "allowlist:view",
            Permission::AllowlistManage => "allowlist:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether a role holds a permission
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, role: &str, permission: Permission) -> bool;
}

/// In-memory role table
#[derive(Debug, Clone, Default)]
pub struct StaticRoleTable {
    grants: HashMap<String, HashSet<Permission>>,
}

impl StaticRoleTable {
    /// An empty table; every check is denied
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: &str, permissions: &[Permission]) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .extend(permissions.iter().copied());
        self
    }

    /// `admin` holds everything, `moderator` may only view the audit log
    pub fn default_roles() -> Self {
        Self::new()
            .grant("admin", &Permission::ALL)
            .grant("moderator", &[Permission::AuditView])
    }
}

impl PermissionOracle for StaticRoleTable {
    fn has_permission(&self, role: &str, permission: Permission) -> bool {
        self.grants
            .get(role)
            .is_some_and(|granted| granted.contains(&permission))
    }
}
