//! Session Store
//!
//! Server-side session records in the key-value store, under two keys:
//! - `session:<sessionId>` holds the JSON record
//! - `userId:<userId>` holds the user's current session id
//!
//! Both keys get the same TTL on every write, and the TTL slides on every
//! re-login. At most one live session exists per user.

use std::sync::Arc;
use std::time::Duration;

use kernel::id::UserId;
use platform::crypto::random_token;
use platform::kv::KeyValueStore;

use crate::domain::entity::SessionRecord;
use crate::error::{AuthError, AuthResult};

const SESSION_KEY_PREFIX: &str = "session:";
const USER_INDEX_KEY_PREFIX: &str = "userId:";

/// Random bytes per session id (base64url encoded in the key and cookie)
const SESSION_ID_BYTES: usize = 32;

/// Upper bound on index claim rounds in `create_or_refresh`
const MAX_CLAIM_ATTEMPTS: usize = 3;

fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

fn user_index_key(user_id: &UserId) -> String {
    format!("{USER_INDEX_KEY_PREFIX}{user_id}")
}

pub struct SessionStore<K> {
    kv: Arc<K>,
    ttl: Duration,
}

impl<K> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            ttl: self.ttl,
        }
    }
}

impl<K> SessionStore<K>
where
    K: KeyValueStore,
{
    pub fn new(kv: Arc<K>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Return the user's live session id, refreshing its TTL, or create one.
    ///
    /// Concurrent first logins race on a set-if-absent of the user index;
    /// the loser drops its freshly written record and adopts the winner's id.
    /// An index left pointing at an expired record is removed and replaced.
    pub async fn create_or_refresh(&self, user_id: &UserId, role: &str) -> AuthResult<String> {
        let index_key = user_index_key(user_id);

        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            if let Some(existing) = self.kv.get(&index_key).await? {
                if self.refresh(&existing, &index_key).await? {
                    tracing::debug!(user_id = %user_id, "Session refreshed");
                    return Ok(existing);
                }

                tracing::warn!(
                    user_id = %user_id,
                    "Indexed session could not be refreshed, re-reading index"
                );
                self.kv.delete_if_eq(&index_key, &existing).await?;
                continue;
            }

            let session_id = random_token(SESSION_ID_BYTES);
            let record_key = session_key(&session_id);
            let record = SessionRecord::new(&session_id, *user_id.as_uuid(), role);
            let json = record
                .to_json()
                .map_err(|e| AuthError::Internal(format!("session encode failed: {e}")))?;

            self.kv.set_ex(&record_key, &json, self.ttl).await?;

            if self.kv.set_nx_ex(&index_key, &session_id, self.ttl).await? {
                tracing::info!(user_id = %user_id, role = role, "Session created");
                return Ok(session_id);
            }

            // Another login claimed the index first
            self.kv.delete(&record_key).await?;
            tracing::debug!(user_id = %user_id, attempt, "Lost session index claim, retrying");
        }

        tracing::error!(
            user_id = %user_id,
            attempts = MAX_CLAIM_ATTEMPTS,
            "Could not settle session index"
        );
        Err(AuthError::StoreUnavailable(
            platform::kv::StoreError::Command("session index did not settle".to_string()),
        ))
    }

    /// Reset the TTL of both keys.
    ///
    /// `false` when the record is gone, or when the index lapsed and another
    /// login claimed it first; in that case this record is dropped so the
    /// user keeps a single live session.
    async fn refresh(&self, session_id: &str, index_key: &str) -> AuthResult<bool> {
        let record_key = session_key(session_id);
        if !self.kv.expire(&record_key, self.ttl).await? {
            return Ok(false);
        }

        if self.kv.expire(index_key, self.ttl).await? {
            return Ok(true);
        }

        // Index expired between the read and now; put it back
        if self.kv.set_nx_ex(index_key, session_id, self.ttl).await? {
            return Ok(true);
        }

        if self.kv.get(index_key).await?.as_deref() == Some(session_id) {
            return Ok(true);
        }

        self.kv.delete(&record_key).await?;
        tracing::debug!("Lost lapsed session index to a concurrent login");
        Ok(false)
    }

    /// Look up a live, logged-in session.
    ///
    /// Every way of not having one yields `Unauthenticated`; only store
    /// failures surface differently.
    pub async fn validate(&self, session_id: &str) -> AuthResult<SessionRecord> {
        if session_id.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let raw = self
            .kv
            .get(&session_key(session_id))
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let record = SessionRecord::from_json(session_id, &raw).map_err(|e| {
            tracing::warn!(error = %e, "Undecodable session record");
            AuthError::Unauthenticated
        })?;

        if !record.logged_in {
            return Err(AuthError::Unauthenticated);
        }

        Ok(record)
    }

    /// Remove the session and its index entry. Unknown ids are a no-op.
    pub async fn destroy(&self, session_id: &str) -> AuthResult<()> {
        if session_id.is_empty() {
            return Ok(());
        }

        let record_key = session_key(session_id);
        let Some(raw) = self.kv.get(&record_key).await? else {
            tracing::debug!("Session already gone");
            return Ok(());
        };

        self.kv.delete(&record_key).await?;

        match SessionRecord::from_json(session_id, &raw) {
            Ok(record) => {
                let index_key = user_index_key(&UserId::from_uuid(record.user_id));
                // A newer session may own the index by now
                self.kv.delete_if_eq(&index_key, session_id).await?;
                tracing::info!(user_id = %record.user_id, "Session destroyed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Destroyed undecodable session record");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{FailingStore, LapsingIndexStore, RacingStore};
    use platform::kv::MemoryStore;

    const HOUR: Duration = Duration::from_secs(3600);

    fn store() -> (SessionStore<MemoryStore>, MemoryStore) {
        let kv = MemoryStore::new();
        (SessionStore::new(Arc::new(kv.clone()), HOUR), kv)
    }

    #[tokio::test]
    async fn test_create_then_validate() {
        let (sessions, kv) = store();
        let user_id = UserId::new();

        let session_id = sessions.create_or_refresh(&user_id, "admin").await.unwrap();
        assert_eq!(session_id.len(), 43);

        let record = sessions.validate(&session_id).await.unwrap();
        assert_eq!(record.user_id, *user_id.as_uuid());
        assert_eq!(record.role, "admin");
        assert!(record.logged_in);

        assert_eq!(
            kv.get(&format!("userId:{user_id}")).await.unwrap(),
            Some(session_id.clone())
        );
        assert!(kv.get(&format!("session:{session_id}")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_relogin_is_idempotent() {
        let (sessions, kv) = store();
        let user_id = UserId::new();

        let first = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        let second = sessions.create_or_refresh(&user_id, "user").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(kv.keys().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_slides_ttl() {
        let (sessions, _kv) = store();
        let user_id = UserId::new();

        let session_id = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        tokio::time::advance(Duration::from_secs(3000)).await;
        sessions.create_or_refresh(&user_id, "user").await.unwrap();
        tokio::time::advance(Duration::from_secs(3000)).await;

        assert!(sessions.validate(&session_id).await.is_ok());

        tokio::time::advance(Duration::from_secs(700)).await;
        assert!(matches!(
            sessions.validate(&session_id).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_issued_and_expired_fail_alike() {
        let (sessions, _kv) = store();
        let session_id = sessions.create_or_refresh(&UserId::new(), "user").await.unwrap();
        tokio::time::advance(HOUR).await;

        let expired = sessions.validate(&session_id).await.unwrap_err();
        let never_issued = sessions.validate("never-issued").await.unwrap_err();
        let empty = sessions.validate("").await.unwrap_err();

        assert!(matches!(expired, AuthError::Unauthenticated));
        assert!(matches!(never_issued, AuthError::Unauthenticated));
        assert!(matches!(empty, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_logged_out_flag_and_garbage_rejected() {
        let (sessions, kv) = store();
        let user_id = uuid::Uuid::new_v4();

        let record = format!(r#"{{"userId":"{user_id}","role":"user","loggedIn":false}}"#);
        kv.set_ex("session:flagged", &record, HOUR).await.unwrap();
        kv.set_ex("session:garbage", "{not json", HOUR).await.unwrap();

        assert!(matches!(
            sessions.validate("flagged").await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            sessions.validate("garbage").await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_destroy() {
        let (sessions, kv) = store();
        let user_id = UserId::new();
        let session_id = sessions.create_or_refresh(&user_id, "user").await.unwrap();

        sessions.destroy(&session_id).await.unwrap();

        assert!(matches!(
            sessions.validate(&session_id).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(kv.keys().await.is_empty());

        // Idempotent
        sessions.destroy(&session_id).await.unwrap();
        sessions.destroy("never-issued").await.unwrap();

        let fresh = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        assert_ne!(fresh, session_id);
    }

    #[tokio::test]
    async fn test_destroy_leaves_newer_index_alone() {
        let (sessions, kv) = store();
        let user_id = UserId::new();
        let index_key = format!("userId:{user_id}");

        let stale = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        kv.set_ex(&index_key, "newer-session", HOUR).await.unwrap();

        sessions.destroy(&stale).await.unwrap();
        assert_eq!(
            kv.get(&index_key).await.unwrap().as_deref(),
            Some("newer-session")
        );
    }

    #[tokio::test]
    async fn test_stale_index_self_heals() {
        let (sessions, kv) = store();
        let user_id = UserId::new();

        let old = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        // Record gone while the index survives
        kv.delete(&format!("session:{old}")).await.unwrap();

        let new = sessions.create_or_refresh(&user_id, "user").await.unwrap();
        assert_ne!(old, new);
        assert!(sessions.validate(&new).await.is_ok());
        assert_eq!(
            kv.get(&format!("userId:{user_id}")).await.unwrap(),
            Some(new)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_first_logins_converge() {
        const LOGINS: usize = 16;

        for _ in 0..20 {
            let (sessions, kv) = store();
            let user_id = UserId::new();
            let barrier = Arc::new(tokio::sync::Barrier::new(LOGINS));

            let handles: Vec<_> = (0..LOGINS)
                .map(|_| {
                    let sessions = sessions.clone();
                    let barrier = barrier.clone();
                    tokio::spawn(async move {
                        barrier.wait().await;
                        sessions.create_or_refresh(&user_id, "user").await
                    })
                })
                .collect();

            let mut ids = Vec::with_capacity(LOGINS);
            for handle in handles {
                ids.push(handle.await.unwrap().unwrap());
            }
            ids.dedup();
            assert_eq!(ids.len(), 1, "all logins share one session");

            let records: Vec<String> = kv
                .keys()
                .await
                .into_iter()
                .filter(|k| k.starts_with("session:"))
                .collect();
            assert_eq!(records, vec![format!("session:{}", ids[0])]);
        }
    }

    #[tokio::test]
    async fn test_lost_claim_adopts_winner_without_orphan() {
        let user_id = UserId::new();
        let kv = RacingStore::new(user_id);
        let inner = kv.inner();
        let sessions = SessionStore::new(Arc::new(kv), HOUR);

        let session_id = sessions.create_or_refresh(&user_id, "user").await.unwrap();

        assert_eq!(session_id, RacingStore::WINNER);
        assert_eq!(
            inner.keys().await,
            vec![
                format!("session:{}", RacingStore::WINNER),
                format!("userId:{user_id}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_lapsed_index_taken_over_drops_own_record() {
        let user_id = UserId::new();
        let kv = LapsingIndexStore::new(user_id);
        let inner = kv.inner();
        let sessions = SessionStore::new(Arc::new(kv), HOUR);

        let own = SessionStore::new(Arc::new(inner.clone()), HOUR)
            .create_or_refresh(&user_id, "user")
            .await
            .unwrap();

        let session_id = sessions.create_or_refresh(&user_id, "user").await.unwrap();

        assert_eq!(session_id, LapsingIndexStore::WINNER);
        assert_ne!(session_id, own);
        assert_eq!(
            inner.keys().await,
            vec![
                format!("session:{}", LapsingIndexStore::WINNER),
                format!("userId:{user_id}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let sessions = SessionStore::new(Arc::new(FailingStore), HOUR);

        assert!(matches!(
            sessions.create_or_refresh(&UserId::new(), "user").await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            sessions.validate("anything").await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            sessions.destroy("anything").await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
