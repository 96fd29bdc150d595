//! Logout Use Case
//!
//! Destroys the server-side session. The bearer token is not revoked and
//! stays cryptographically valid until it expires.

use std::sync::Arc;

use platform::kv::KeyValueStore;

use crate::application::session_store::SessionStore;
use crate::error::{AuthError, AuthResult};

/// Logout use case
pub struct LogoutUseCase<K>
where
    K: KeyValueStore,
{
    sessions: Arc<SessionStore<K>>,
}

impl<K> LogoutUseCase<K>
where
    K: KeyValueStore,
{
    pub fn new(sessions: Arc<SessionStore<K>>) -> Self {
        Self { sessions }
    }

    /// Both artifacts must be presented; a request holding only one is
    /// not a logged-in client.
    pub async fn execute(&self, session_id: Option<&str>, token: Option<&str>) -> AuthResult<()> {
        let (Some(session_id), Some(_token)) = (session_id, token) else {
            return Err(AuthError::Validation(
                "No session or token found".to_string(),
            ));
        };

        self.sessions.destroy(session_id).await?;

        tracing::info!("User logged out");
        Ok(())
    }
}
