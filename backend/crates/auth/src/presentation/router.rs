//! Auth Router
//!
//! | Route            | Policy          |
//! |------------------|-----------------|
//! | `POST /signUp`   | Public          |
//! | `POST /login`    | Public          |
//! | `POST /logout`   | Public          |
//! | `GET /me`        | TokenAndSession |
//! | `GET /session`   | Session         |
//! | `GET /token`     | Token           |

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use platform::kv::KeyValueStore;

use crate::application::config::AuthConfig;
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{
    PolicyGuard, RoutePolicy, require_policy, require_session, require_token,
};

/// Create the Auth router for any identity and key-value store
pub fn auth_router<R, K>(repo: R, kv: K, config: AuthConfig) -> Router
where
    R: UserRepository + RoleRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    auth_router_with_state(AuthAppState::new(repo, kv, config))
}

/// Create the Auth router from prepared state
pub fn auth_router_with_state<R, K>(state: AuthAppState<R, K>) -> Router
where
    R: UserRepository + RoleRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    let guard = |policy| PolicyGuard::new(state.clone(), policy);

    Router::new()
        .route("/signUp", post(handlers::sign_up::<R, K>))
        .route("/login", post(handlers::login::<R, K>))
        .route("/logout", post(handlers::logout::<R, K>))
        .route(
            "/me",
            get(handlers::me).route_layer(from_fn_with_state(
                guard(RoutePolicy::TokenAndSession),
                require_policy::<R, K>,
            )),
        )
        .route(
            "/session",
            get(handlers::session_status)
                .route_layer(from_fn_with_state(state.clone(), require_session::<R, K>)),
        )
        .route(
            "/token",
            get(handlers::token_status)
                .route_layer(from_fn_with_state(state.clone(), require_token::<R, K>)),
        )
        .with_state(state)
}
