//! HTTP Handlers

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Extension, Json};
use std::sync::Arc;

use platform::cookie::CookieSigner;
use platform::kv::KeyValueStore;
use platform::password::CredentialVerifier;

use crate::application::config::AuthConfig;
use crate::application::{
    LoginInput, LoginUseCase, LogoutUseCase, SessionStore, SignUpInput, SignUpUseCase,
    TokenIssuer,
};
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    LoginRequest, LoginResponse, MessageResponse, SessionStatusResponse, SignUpRequest,
    TokenStatusResponse, UserInfoResponse,
};
use crate::presentation::middleware::RequestContext;

/// Shared state for auth handlers
///
/// `R` is the identity store, `K` the key-value store behind sessions.
pub struct AuthAppState<R, K> {
    pub repo: Arc<R>,
    pub sessions: Arc<SessionStore<K>>,
    pub tokens: Arc<TokenIssuer>,
    pub verifier: Arc<CredentialVerifier>,
    pub signer: Arc<CookieSigner>,
    pub config: Arc<AuthConfig>,
}

impl<R, K: KeyValueStore> AuthAppState<R, K> {
    pub fn new(repo: R, kv: K, config: AuthConfig) -> Self {
        let sessions = SessionStore::new(Arc::new(kv), config.session_ttl);
        let tokens = TokenIssuer::new(&config.token_secret, config.token_ttl);
        let verifier = CredentialVerifier::new(config.password_pepper.clone());
        let signer = CookieSigner::new(config.cookie_secret.clone());

        Self {
            repo: Arc::new(repo),
            sessions: Arc::new(sessions),
            tokens: Arc::new(tokens),
            verifier: Arc::new(verifier),
            signer: Arc::new(signer),
            config: Arc::new(config),
        }
    }
}

impl<R, K> Clone for AuthAppState<R, K> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            sessions: self.sessions.clone(),
            tokens: self.tokens.clone(),
            verifier: self.verifier.clone(),
            signer: self.signer.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/user/signUp
pub async fn sign_up<R, K>(
    State(state): State<AuthAppState<R, K>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + RoleRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = SignUpUseCase::new(state.repo.clone(), state.verifier.clone());

    let input = SignUpInput {
        name: req.name,
        user_name: req.username,
        password: req.password,
        email: req.email,
    };

    let output = use_case.execute(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "User {} created successfully!",
            output.name
        ))),
    ))
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/user/login
pub async fn login<R, K>(
    State(state): State<AuthAppState<R, K>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + RoleRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.sessions.clone(),
        state.tokens.clone(),
        state.verifier.clone(),
    );

    let input = LoginInput {
        user_name: req.username,
        password: req.password,
    };

    let output = use_case.execute(input).await?;

    let session_cookie = state
        .config
        .session_cookie()
        .build_set_cookie(&state.signer.sign(&output.session_id));
    let token_cookie = state
        .config
        .token_cookie()
        .build_set_cookie(&state.signer.sign(&output.access_token));

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, token_cookie),
        ]),
        Json(LoginResponse {
            message: format!("Login successfully! Welcome back {}.", output.name),
            access_token: output.access_token,
            session_id: output.session_id,
        }),
    ))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/user/logout
pub async fn logout<R, K>(
    State(state): State<AuthAppState<R, K>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + RoleRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let session_id = state
        .signer
        .extract(&headers, &state.config.session_cookie_name);
    let token = state
        .signer
        .extract(&headers, &state.config.token_cookie_name);

    let use_case = LogoutUseCase::new(state.sessions.clone());
    use_case
        .execute(session_id.as_deref(), token.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (
                header::SET_COOKIE,
                state.config.session_cookie().build_delete_cookie(),
            ),
            (
                header::SET_COOKIE,
                state.config.token_cookie().build_delete_cookie(),
            ),
        ]),
        Json(MessageResponse::new("Logout successful")),
    ))
}

// ============================================================================
// Protected
// ============================================================================

/// GET /api/user/me (token and session)
pub async fn me(Extension(context): Extension<RequestContext>) -> AuthResult<impl IntoResponse> {
    let claims = context.claims().ok_or(AuthError::MissingToken)?;
    let session = context.session().ok_or(AuthError::Unauthenticated)?;

    // Both cookies must come from the same login
    if claims.sub != session.user_id.to_string() {
        tracing::warn!(
            token_user = %claims.sub,
            session_user = %session.user_id,
            "Token and session belong to different users"
        );
        return Err(AuthError::Unauthenticated);
    }

    Ok(Json(UserInfoResponse {
        user_id: claims.sub.clone(),
        name: claims.name.clone(),
        email: claims.email.clone(),
        role: session.role.clone(),
        token_expires_at: claims.exp,
    }))
}

/// GET /api/user/session (session)
pub async fn session_status(
    Extension(context): Extension<RequestContext>,
) -> AuthResult<impl IntoResponse> {
    let session = context.session().ok_or(AuthError::Unauthenticated)?;

    Ok(Json(SessionStatusResponse {
        authenticated: true,
        role: session.role.clone(),
    }))
}

/// GET /api/user/token (token)
///
/// Accepts a token whose session has ended; the token is only refused once
/// it expires.
pub async fn token_status(
    Extension(context): Extension<RequestContext>,
) -> AuthResult<impl IntoResponse> {
    let claims = context.claims().ok_or(AuthError::MissingToken)?;

    Ok(Json(TokenStatusResponse {
        user_id: claims.sub.clone(),
        role: claims.role.clone(),
        expires_at: claims.exp,
    }))
}
