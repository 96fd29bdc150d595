//! Cookie Management Infrastructure
//!
//! Set-Cookie construction, cookie extraction and HMAC-signed cookie values.
//!
//! A signed value has the form `<value>.<base64url(HMAC-SHA256(secret, value))>`.

use axum::http::{HeaderMap, header};
use thiserror::Error;

use crate::crypto::{from_base64url, hmac_sha256, to_base64url, verify_hmac_sha256};

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            max_age_secs: None,
        }
    }
}

impl CookieConfig {
    /// Build Set-Cookie header value
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut cookie = format!("{}={}", self.name, value);
        self.push_attributes(&mut cookie);

        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        cookie
    }

    /// Build Set-Cookie header for deletion (expired)
    ///
    /// Attributes must match the original cookie or browsers keep it.
    pub fn build_delete_cookie(&self) -> String {
        let mut cookie = format!("{}=", self.name);
        self.push_attributes(&mut cookie);
        cookie.push_str("; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        cookie
    }

    fn push_attributes(&self, cookie: &mut String) {
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", self.path));
    }
}

/// Extract a cookie value from headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;

            if key == name {
                Some(value.to_string())
            } else {
                None
            }
        })
}

// ============================================================================
// Signed cookies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CookieError {
    #[error("Cookie value is not signed")]
    Unsigned,

    #[error("Cookie signature mismatch")]
    BadSignature,
}

/// Signs and verifies cookie values with the cookie secret.
#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
}

impl CookieSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn sign(&self, value: &str) -> String {
        let tag = hmac_sha256(&self.secret, value.as_bytes());
        format!("{}.{}", value, to_base64url(&tag))
    }

    /// Recover the original value. Values may themselves contain `.`
    /// (JWTs do), so the tag is split off the right.
    pub fn unsign(&self, signed: &str) -> Result<String, CookieError> {
        let (value, tag_b64) = signed.rsplit_once('.').ok_or(CookieError::Unsigned)?;
        let tag = from_base64url(tag_b64).map_err(|_| CookieError::BadSignature)?;

        if verify_hmac_sha256(&self.secret, value.as_bytes(), &tag) {
            Ok(value.to_string())
        } else {
            Err(CookieError::BadSignature)
        }
    }

    /// Read a signed cookie. Missing and tampered cookies both yield `None`.
    pub fn extract(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        let raw = extract_cookie(headers, name)?;
        match self.unsign(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(cookie = name, error = %e, "Rejected signed cookie");
                None
            }
        }
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_config_build() {
        let config = CookieConfig {
            name: "sessionId".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Strict,
            path: "/api".to_string(),
            max_age_secs: Some(3600),
        };

        let cookie = config.build_set_cookie("value123");
        assert!(cookie.starts_with("sessionId=value123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/api"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_delete_cookie_keeps_attributes() {
        let config = CookieConfig {
            name: "jsonWebToken".to_string(),
            ..CookieConfig::default()
        };
        let cookie = config.build_delete_cookie();
        assert!(cookie.starts_with("jsonWebToken=;"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; session=abc123; other=xyz"),
        );

        assert_eq!(
            extract_cookie(&headers, "session"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie(&headers, "foo"), Some("bar".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_sign_and_unsign() {
        let signer = CookieSigner::new(b"cookie-secret".to_vec());
        let jwt_like = "aaa.bbb.ccc";
        let signed = signer.sign(jwt_like);

        assert_eq!(signer.unsign(&signed).unwrap(), jwt_like);
    }

    #[test]
    fn test_tampered_cookie_rejected() {
        let signer = CookieSigner::new(b"cookie-secret".to_vec());
        let signed = signer.sign("session-a");
        let (_, tag) = signed.rsplit_once('.').unwrap();
        let forged = format!("session-b.{}", tag);

        assert_eq!(signer.unsign(&forged), Err(CookieError::BadSignature));
        assert_eq!(signer.unsign("no-signature"), Err(CookieError::Unsigned));

        let other = CookieSigner::new(b"other-secret".to_vec());
        assert_eq!(other.unsign(&signed), Err(CookieError::BadSignature));
    }

    #[test]
    fn test_extract_signed() {
        let signer = CookieSigner::new(b"cookie-secret".to_vec());
        let mut headers = HeaderMap::new();
        let raw = format!("sessionId={}; jsonWebToken=forged.value", signer.sign("abc"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&raw).unwrap());

        assert_eq!(signer.extract(&headers, "sessionId"), Some("abc".to_string()));
        assert_eq!(signer.extract(&headers, "jsonWebToken"), None);
        assert_eq!(signer.extract(&headers, "missing"), None);
    }
}
