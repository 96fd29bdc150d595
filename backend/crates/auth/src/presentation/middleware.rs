//! Auth Middleware
//!
//! Route protection is declared per route with a [`RoutePolicy`]. Each
//! check that passes adds its result to an immutable [`RequestContext`]
//! carried in the request extensions; handlers read it with
//! `Extension<RequestContext>`.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use platform::kv::KeyValueStore;

use crate::application::token::TokenClaims;
use crate::domain::entity::SessionRecord;
use crate::error::{AuthError, AuthResult};
use crate::presentation::handlers::AuthAppState;

/// Which checks admit a request to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No check
    Public,
    /// Valid bearer token
    Token,
    /// Live server-side session
    Session,
    /// Both, token checked first
    TokenAndSession,
}

impl RoutePolicy {
    pub fn requires_token(self) -> bool {
        matches!(self, RoutePolicy::Token | RoutePolicy::TokenAndSession)
    }

    pub fn requires_session(self) -> bool {
        matches!(self, RoutePolicy::Session | RoutePolicy::TokenAndSession)
    }
}

/// Per-request authentication facts, built up by the middleware
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    claims: Option<TokenClaims>,
    session: Option<SessionRecord>,
}

impl RequestContext {
    pub fn with_claims(&self, claims: TokenClaims) -> Self {
        Self {
            claims: Some(claims),
            ..self.clone()
        }
    }

    pub fn with_session(&self, session: SessionRecord) -> Self {
        Self {
            session: Some(session),
            ..self.clone()
        }
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.claims.as_ref()
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }
}

/// State for [`require_policy`]
pub struct PolicyGuard<R, K> {
    pub state: AuthAppState<R, K>,
    pub policy: RoutePolicy,
}

impl<R, K> PolicyGuard<R, K> {
    pub fn new(state: AuthAppState<R, K>, policy: RoutePolicy) -> Self {
        Self { state, policy }
    }
}

impl<R, K> Clone for PolicyGuard<R, K> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            policy: self.policy,
        }
    }
}

/// `Authorization: Bearer <token>`, else the signed token cookie
fn extract_token<R, K>(state: &AuthAppState<R, K>, headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        state
            .signer
            .extract(headers, &state.config.token_cookie_name)
    })
}

fn current_context(req: &Request) -> RequestContext {
    req.extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
}

fn check_token<R, K>(
    state: &AuthAppState<R, K>,
    headers: &HeaderMap,
    context: RequestContext,
) -> AuthResult<RequestContext> {
    let token = extract_token(state, headers).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify(&token)?;
    Ok(context.with_claims(claims))
}

async fn check_session<R, K>(
    state: &AuthAppState<R, K>,
    headers: &HeaderMap,
    context: RequestContext,
) -> AuthResult<RequestContext>
where
    K: KeyValueStore,
{
    let session_id = state
        .signer
        .extract(headers, &state.config.session_cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let record = state.sessions.validate(&session_id).await?;
    Ok(context.with_session(record))
}

/// Apply `policy` and return the request with its rebuilt context
pub async fn authorize<R, K>(
    state: &AuthAppState<R, K>,
    policy: RoutePolicy,
    mut req: Request,
) -> AuthResult<Request>
where
    K: KeyValueStore,
{
    if policy.requires_token() {
        let context = check_token(state, req.headers(), current_context(&req))?;
        req.extensions_mut().insert(context);
    }

    if policy.requires_session() {
        let context = check_session(state, req.headers(), current_context(&req)).await?;
        req.extensions_mut().insert(context);
    }

    Ok(req)
}

/// Middleware enforcing the guard's route policy
pub async fn require_policy<R, K>(
    State(guard): State<PolicyGuard<R, K>>,
    req: Request,
    next: Next,
) -> AuthResult<Response>
where
    R: Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let req = authorize(&guard.state, guard.policy, req).await?;
    Ok(next.run(req).await)
}

/// Middleware requiring a valid bearer token
pub async fn require_token<R, K>(
    State(state): State<AuthAppState<R, K>>,
    req: Request,
    next: Next,
) -> AuthResult<Response>
where
    R: Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let req = authorize(&state, RoutePolicy::Token, req).await?;
    Ok(next.run(req).await)
}

/// Middleware requiring a live session
pub async fn require_session<R, K>(
    State(state): State<AuthAppState<R, K>>,
    req: Request,
    next: Next,
) -> AuthResult<Response>
where
    R: Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let req = authorize(&state, RoutePolicy::Session, req).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_requirements() {
        assert!(!RoutePolicy::Public.requires_token());
        assert!(!RoutePolicy::Public.requires_session());
        assert!(RoutePolicy::Token.requires_token());
        assert!(!RoutePolicy::Token.requires_session());
        assert!(RoutePolicy::Session.requires_session());
        assert!(RoutePolicy::TokenAndSession.requires_token());
        assert!(RoutePolicy::TokenAndSession.requires_session());
    }

    #[test]
    fn test_context_is_rebuilt_not_mutated() {
        let empty = RequestContext::default();
        let record = SessionRecord::new("sid", uuid::Uuid::new_v4(), "user");
        let with_session = empty.with_session(record.clone());

        assert!(empty.session().is_none());
        assert_eq!(with_session.session(), Some(&record));
        assert!(with_session.claims().is_none());
    }
}
