//! User Entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::entity::role::{ADMIN_ROLE, Role, USER_ROLE};
use crate::domain::value_object::{email::Email, user_name::UserName};

/// User entity
///
/// Roles are loaded with the user; a user without any role is treated as
/// holding `user`.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Login name (unique)
    pub user_name: UserName,
    /// Contact address (unique)
    pub email: Email,
    pub password_hash: HashedPassword,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user
    pub fn new(
        name: impl Into<String>,
        user_name: UserName,
        email: Email,
        password_hash: HashedPassword,
        roles: Vec<Role>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            name: name.into(),
            user_name,
            email,
            password_hash,
            roles,
            created_at: Utc::now(),
        }
    }

    /// Most privileged role held: `admin` wins, otherwise the first role,
    /// otherwise `user`.
    pub fn primary_role(&self) -> &str {
        if self.has_role(ADMIN_ROLE) {
            return ADMIN_ROLE;
        }

        self.roles
            .first()
            .map(|role| role.name.as_str())
            .unwrap_or(USER_ROLE)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }

    /// Permission lookup across every role held
    pub fn has_permission(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.grants(name))
    }
}
