//! Login Use Case
//!
//! Verifies credentials, issues a bearer token and creates or refreshes
//! the user's server-side session.

use std::sync::Arc;

use platform::kv::KeyValueStore;
use platform::password::{ClearTextPassword, CredentialVerifier};

use crate::application::session_store::SessionStore;
use crate::application::token::TokenIssuer;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

/// Login input
pub struct LoginInput {
    pub user_name: String,
    pub password: String,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    /// Display name of the user
    pub name: String,
    pub access_token: String,
    pub session_id: String,
}

/// Login use case
pub struct LoginUseCase<U, K>
where
    U: UserRepository,
    K: KeyValueStore,
{
    user_repo: Arc<U>,
    sessions: Arc<SessionStore<K>>,
    tokens: Arc<TokenIssuer>,
    verifier: Arc<CredentialVerifier>,
}

impl<U, K> LoginUseCase<U, K>
where
    U: UserRepository,
    K: KeyValueStore,
{
    pub fn new(
        user_repo: Arc<U>,
        sessions: Arc<SessionStore<K>>,
        tokens: Arc<TokenIssuer>,
        verifier: Arc<CredentialVerifier>,
    ) -> Self {
        Self {
            user_repo,
            sessions,
            tokens,
            verifier,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        if input.user_name.trim().is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        // A name that cannot be valid cannot belong to anyone
        let user_name = UserName::new(&input.user_name).map_err(|_| AuthError::UserNotFound)?;

        let user = self
            .user_repo
            .find_by_user_name(&user_name)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password =
            ClearTextPassword::new(input.password).map_err(|_| AuthError::InvalidCredentials)?;

        let password_valid = self
            .verifier
            .verify(&password, user.password_hash.as_phc_string())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !password_valid {
            tracing::warn!(user_id = %user.user_id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.sign(&user)?;
        let session_id = self
            .sessions
            .create_or_refresh(&user.user_id, user.primary_role())
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            role = user.primary_role(),
            "User logged in"
        );

        Ok(LoginOutput {
            name: user.name,
            access_token,
            session_id,
        })
    }
}
