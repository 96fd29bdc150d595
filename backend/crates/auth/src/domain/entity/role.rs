//! Role and Permission Entities
//!
//! Read-mostly reference data, seeded once at startup.

use kernel::id::{PermissionId, RoleId};

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";

pub const READ_PERMISSION: &str = "read";
pub const WRITE_PERMISSION: &str = "write";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub permission_id: PermissionId,
    pub name: String,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            permission_id: PermissionId::new(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub role_id: RoleId,
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            role_id: RoleId::new(),
            name: name.into(),
            permissions,
        }
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p.name == permission)
    }
}
