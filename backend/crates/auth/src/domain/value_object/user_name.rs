//! User Name Value Object
//!
//! Login handle. Input is NFKC-normalised and trimmed; case is kept for
//! display while uniqueness and lookup use the lowercase canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Maximum length for user name (in characters)
pub const USER_NAME_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserNameError {
    #[error("User name cannot be empty")]
    Empty,

    #[error("User name is too long ({length} chars, maximum {USER_NAME_MAX_LENGTH})")]
    TooLong { length: usize },

    #[error("User name cannot contain whitespace or control characters")]
    InvalidCharacter,
}

/// Validated, normalized user name
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName {
    /// As entered (trimmed, NFKC)
    original: String,
    /// Lowercase form for uniqueness
    canonical: String,
}

impl UserName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UserNameError> {
        let original: String = input.as_ref().nfkc().collect::<String>().trim().to_string();

        if original.is_empty() {
            return Err(UserNameError::Empty);
        }

        let length = original.chars().count();
        if length > USER_NAME_MAX_LENGTH {
            return Err(UserNameError::TooLong { length });
        }

        if original
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(UserNameError::InvalidCharacter);
        }

        let canonical = original.to_lowercase();
        Ok(Self {
            original,
            canonical,
        })
    }

    /// Create from database value (assumes already validated)
    pub fn from_db(original: impl Into<String>) -> Self {
        let original = original.into();
        let canonical = original.to_lowercase();
        Self {
            original,
            canonical,
        }
    }

    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserName({:?})", self.original)
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl TryFrom<String> for UserName {
    type Error = UserNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserName::new(value)
    }
}

impl From<UserName> for String {
    fn from(user_name: UserName) -> Self {
        user_name.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_canonical_form() {
        let name = UserName::new("  Alice ").unwrap();
        assert_eq!(name.original(), "Alice");
        assert_eq!(name.canonical(), "alice");
    }

    #[test]
    fn test_user_name_nfkc() {
        // Fullwidth letters fold to ASCII
        let name = UserName::new("ａｄｍｉｎ").unwrap();
        assert_eq!(name.canonical(), "admin");
    }

    #[test]
    fn test_user_name_invalid() {
        assert_eq!(UserName::new("   "), Err(UserNameError::Empty));
        assert_eq!(
            UserName::new("two words"),
            Err(UserNameError::InvalidCharacter)
        );
        assert!(matches!(
            UserName::new("a".repeat(USER_NAME_MAX_LENGTH + 1)),
            Err(UserNameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_short_names_allowed() {
        assert!(UserName::new("al").is_ok());
        assert!(UserName::new("user").is_ok());
    }
}
