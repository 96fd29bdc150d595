//! Reference Data Seeding
//!
//! Creates the `read`/`write` permissions, the `admin` and `user` roles and
//! one account per role, unless `admin` already exists.

use std::sync::Arc;

use platform::password::{ClearTextPassword, CredentialVerifier};

use crate::domain::entity::role::{ADMIN_ROLE, READ_PERMISSION, USER_ROLE, WRITE_PERMISSION};
use crate::domain::entity::{Permission, Role, User};
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::domain::value_object::{email::Email, user_name::UserName};
use crate::error::{AuthError, AuthResult};

struct SeedAccount {
    name: &'static str,
    user_name: &'static str,
    password: &'static str,
    email: &'static str,
    role: &'static str,
}

const SEED_ACCOUNTS: &[SeedAccount] = &[
    SeedAccount {
        name: "Administrator",
        user_name: "admin",
        password: "adminpassword",
        email: "admin@example.com",
        role: ADMIN_ROLE,
    },
    SeedAccount {
        name: "Default User",
        user_name: "user",
        password: "userpassword",
        email: "user@example.com",
        role: USER_ROLE,
    },
];

/// Seed use case
pub struct SeedUseCase<R>
where
    R: UserRepository + RoleRepository,
{
    repo: Arc<R>,
    verifier: Arc<CredentialVerifier>,
}

impl<R> SeedUseCase<R>
where
    R: UserRepository + RoleRepository,
{
    pub fn new(repo: Arc<R>, verifier: Arc<CredentialVerifier>) -> Self {
        Self { repo, verifier }
    }

    /// Returns `false` when the data was already present.
    pub async fn execute(&self) -> AuthResult<bool> {
        if self.repo.find_by_name(ADMIN_ROLE).await?.is_some() {
            tracing::debug!("Reference data already seeded");
            return Ok(false);
        }

        let read = Permission::new(READ_PERMISSION);
        let write = Permission::new(WRITE_PERMISSION);
        for permission in [&read, &write] {
            self.repo.create_permission(permission).await?;
        }

        let admin = Role::new(ADMIN_ROLE, vec![read.clone(), write]);
        let user = Role::new(USER_ROLE, vec![read]);
        for role in [&admin, &user] {
            self.repo.create_role(role).await?;
        }

        for account in SEED_ACCOUNTS {
            let role = if account.role == ADMIN_ROLE { &admin } else { &user };
            let seeded = self.build_account(account, role)?;
            self.repo.create(&seeded).await?;
        }

        tracing::info!(
            accounts = SEED_ACCOUNTS.len(),
            "Seeded roles, permissions and default accounts"
        );
        Ok(true)
    }

    fn build_account(&self, account: &SeedAccount, role: &Role) -> AuthResult<User> {
        let invalid = |e: String| AuthError::Internal(format!("invalid seed account: {e}"));

        let user_name = UserName::new(account.user_name).map_err(|e| invalid(e.to_string()))?;
        let email = Email::new(account.email).map_err(|e| invalid(e.to_string()))?;
        let password =
            ClearTextPassword::new(account.password).map_err(|e| invalid(e.to_string()))?;
        let password_hash = self
            .verifier
            .hash(&password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(User::new(
            account.name,
            user_name,
            email,
            password_hash,
            vec![role.clone()],
        ))
    }
}
