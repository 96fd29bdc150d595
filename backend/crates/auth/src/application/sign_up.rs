//! Sign Up Use Case
//!
//! Creates a new user account holding the `user` role.

use std::sync::Arc;

use platform::password::{ClearTextPassword, CredentialVerifier};

use crate::domain::entity::{User, role::USER_ROLE};
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::domain::value_object::{email::Email, user_name::UserName};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub name: String,
    pub user_name: String,
    pub password: String,
    pub email: String,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub name: String,
}

/// Sign up use case
pub struct SignUpUseCase<R>
where
    R: UserRepository + RoleRepository,
{
    repo: Arc<R>,
    verifier: Arc<CredentialVerifier>,
}

impl<R> SignUpUseCase<R>
where
    R: UserRepository + RoleRepository,
{
    pub fn new(repo: Arc<R>, verifier: Arc<CredentialVerifier>) -> Self {
        Self { repo, verifier }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let fields = [&input.name, &input.user_name, &input.password, &input.email];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let user_name =
            UserName::new(&input.user_name).map_err(|e| AuthError::Validation(e.to_string()))?;
        let email = Email::new(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;

        let password = ClearTextPassword::new(input.password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let password_hash = self
            .verifier
            .hash(&password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let roles = match self.repo.find_by_name(USER_ROLE).await? {
            Some(role) => vec![role],
            None => {
                tracing::warn!("Role 'user' not seeded, creating user without roles");
                Vec::new()
            }
        };

        let name = input.name.trim().to_string();
        let user = User::new(name.clone(), user_name, email, password_hash, roles);

        self.repo.create(&user).await?;

        tracing::info!(user_id = %user.user_id, "User signed up");

        Ok(SignUpOutput { name })
    }
}
