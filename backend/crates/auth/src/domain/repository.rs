//! Repository Traits
//!
//! Interfaces for identity persistence. Implementations are in the
//! infrastructure layer.

use kernel::id::UserId;

use crate::domain::entity::{Permission, Role, User};
use crate::domain::value_object::user_name::UserName;
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Persist a new user with its role links.
    /// Fails with `AuthError::Conflict` when the user name or email is taken.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Find a live (not soft-deleted) user by canonical user name, roles included
    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>>;
}

/// Role and permission repository trait
#[trait_variant::make(RoleRepository: Send)]
pub trait LocalRoleRepository {
    /// Find a role by name, permissions included
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>>;

    /// Roles held by a user, permissions included
    async fn roles_for_user(&self, user_id: &UserId) -> AuthResult<Vec<Role>>;

    async fn create_permission(&self, permission: &Permission) -> AuthResult<()>;

    /// Persist a role with links to its (already stored) permissions
    async fn create_role(&self, role: &Role) -> AuthResult<()>;
}
