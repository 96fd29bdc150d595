//! Session Record
//!
//! Server-side half of a login, stored as JSON in the key-value store:
//! `{"userId": "...", "role": "...", "loggedIn": true}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Key suffix; not part of the stored JSON
    #[serde(skip)]
    pub session_id: String,
    pub user_id: Uuid,
    pub role: String,
    #[serde(default)]
    pub logged_in: bool,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            role: role.into(),
            logged_in: true,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored record and attach the id it was stored under
    pub fn from_json(session_id: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let mut record: SessionRecord = serde_json::from_str(raw)?;
        record.session_id = session_id.to_string();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_shape() {
        let user_id = Uuid::new_v4();
        let record = SessionRecord::new("abc", user_id, "admin");
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "userId": user_id, "role": "admin", "loggedIn": true })
        );
    }

    #[test]
    fn test_missing_logged_in_flag_reads_as_false() {
        let raw = format!(r#"{{"userId":"{}","role":"user"}}"#, Uuid::new_v4());
        let record = SessionRecord::from_json("abc", &raw).unwrap();
        assert!(!record.logged_in);
        assert_eq!(record.session_id, "abc");
    }
}
