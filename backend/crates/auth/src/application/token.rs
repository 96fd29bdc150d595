//! Bearer Token Issuer
//!
//! HS256 JWTs carrying the caller's identity. Verification is purely
//! cryptographic; whether the caller is still logged in is the session
//! store's call.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entity::User;
use crate::error::{AuthError, AuthResult};

/// Claims embedded in every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn for_user(user: &User, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user.user_id.to_string(),
            name: user.name.clone(),
            email: user.email.to_string(),
            role: user.primary_role().to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user`, expiring `ttl` from now
    pub fn sign(&self, user: &User) -> AuthResult<String> {
        self.sign_claims(&TokenClaims::for_user(user, Utc::now(), self.ttl))
    }

    pub fn sign_claims(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Check signature and expiry. The `Bearer ` prefix must already be stripped.
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    tracing::debug!(error = %e, "Token verification failed");
                    AuthError::InvalidToken
                }
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn claims(iat: i64, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: uuid::Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
            iat,
            exp,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let issuer = TokenIssuer::new(b"token-secret", DAY);
        let now = Utc::now().timestamp();
        let original = claims(now, now + DAY.as_secs() as i64);

        let token = issuer.sign_claims(&original).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), original);
    }

    #[test]
    fn test_flipped_signature_is_invalid() {
        let issuer = TokenIssuer::new(b"token-secret", DAY);
        let now = Utc::now().timestamp();
        let token = issuer.sign_claims(&claims(now, now + 60)).unwrap();

        let signature_start = token.rfind('.').unwrap() + 1;
        let flip_at = signature_start + (token.len() - signature_start) / 2;
        let mut bytes = token.into_bytes();
        bytes[flip_at] = if bytes[flip_at] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(issuer.verify(&tampered), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new(b"token-secret", DAY);
        let now = Utc::now().timestamp();
        let token = issuer.sign_claims(&claims(now - 90_000, now - 3_600)).unwrap();

        assert!(matches!(issuer.verify(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let issuer = TokenIssuer::new(b"token-secret", DAY);
        let other = TokenIssuer::new(b"other-secret", DAY);
        let now = Utc::now().timestamp();
        let token = other.sign_claims(&claims(now, now + 60)).unwrap();

        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify("not.a.jwt"), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify(""), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_expiry_is_one_day_after_issue() {
        let issued_at = Utc::now();
        let user = crate::tests::fixtures::user("alice", "user");
        let claims = TokenClaims::for_user(&user, issued_at, DAY);

        assert_eq!(claims.exp - claims.iat, 86_400);
        assert_eq!(claims.sub, user.user_id.to_string());
        assert_eq!(claims.role, "user");
    }
}
