//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Session id cookie name
    pub session_cookie_name: String,
    /// Bearer token cookie name
    pub token_cookie_name: String,
    /// HS256 key for bearer tokens
    pub token_secret: Vec<u8>,
    /// HMAC key for signed cookie values
    pub cookie_secret: Vec<u8>,
    /// Sliding session record TTL
    pub session_ttl: Duration,
    /// Bearer token lifetime, fixed at issue
    pub token_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "sessionId".to_string(),
            token_cookie_name: "jsonWebToken".to_string(),
            token_secret: Vec::new(),
            cookie_secret: Vec::new(),
            session_ttl: Duration::from_secs(3600),   // 1 hour
            token_ttl: Duration::from_secs(24 * 3600), // 1 day
            cookie_secure: true,
            cookie_same_site: SameSite::Strict,
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    /// Create config with random token and cookie secrets (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut token_secret = vec![0u8; 32];
        let mut cookie_secret = vec![0u8; 32];
        rand::rng().fill_bytes(&mut token_secret);
        rand::rng().fill_bytes(&mut cookie_secret);
        Self {
            token_secret,
            cookie_secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    fn cookie(&self, name: &str, max_age: Duration) -> CookieConfig {
        CookieConfig {
            name: name.to_string(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age_secs: Some(max_age.as_secs() as i64),
        }
    }

    /// Cookie carrying the signed session id
    pub fn session_cookie(&self) -> CookieConfig {
        self.cookie(&self.session_cookie_name, self.session_ttl)
    }

    /// Cookie carrying the signed bearer token
    pub fn token_cookie(&self) -> CookieConfig {
        self.cookie(&self.token_cookie_name, self.token_ttl)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_cookie_name", &self.session_cookie_name)
            .field("token_cookie_name", &self.token_cookie_name)
            .field("session_ttl", &self.session_ttl)
            .field("token_ttl", &self.token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_same_site", &self.cookie_same_site)
            .finish_non_exhaustive()
    }
}
