//! In-Memory Identity Store
//!
//! Development and test backend with the same uniqueness rules as the
//! database schema.

use std::collections::HashMap;
use std::sync::Arc;

use kernel::id::UserId;
use tokio::sync::RwLock;

use crate::domain::entity::{Permission, Role, User};
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    roles: HashMap<String, Role>,
    permissions: HashMap<String, Permission>,
}

/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

impl UserRepository for MemoryIdentityStore {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.write().await;

        let taken = tables.users.values().any(|existing| {
            existing.user_name.canonical() == user.user_name.canonical()
                || existing.email == user.email
        });
        if taken {
            return Err(AuthError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        tables.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.user_name.canonical() == user_name.canonical())
            .cloned())
    }
}

impl RoleRepository for MemoryIdentityStore {
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(name).cloned())
    }

    async fn roles_for_user(&self, user_id: &UserId) -> AuthResult<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(user_id)
            .map(|user| user.roles.clone())
            .unwrap_or_default())
    }

    async fn create_permission(&self, permission: &Permission) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if tables.permissions.contains_key(&permission.name) {
            return Err(AuthError::Conflict(format!(
                "Permission '{}' already exists",
                permission.name
            )));
        }
        tables
            .permissions
            .insert(permission.name.clone(), permission.clone());
        Ok(())
    }

    async fn create_role(&self, role: &Role) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if tables.roles.contains_key(&role.name) {
            return Err(AuthError::Conflict(format!(
                "Role '{}' already exists",
                role.name
            )));
        }
        if let Some(missing) = role
            .permissions
            .iter()
            .find(|p| !tables.permissions.contains_key(&p.name))
        {
            return Err(AuthError::Internal(format!(
                "Role '{}' references unknown permission '{}'",
                role.name, missing.name
            )));
        }
        tables.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }
}
