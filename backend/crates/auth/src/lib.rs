//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token issuer, session store
//! - `infra/` - Identity store implementations (PostgreSQL, in-memory)
//! - `presentation/` - HTTP handlers, DTOs, middleware, router
//!
//! ## Hybrid Authentication
//! A login yields two artifacts:
//! - a signed bearer token (stateless, 24h) asserting identity
//! - a session id naming a server-side record (sliding 1h TTL) asserting
//!   that the caller is still logged in
//!
//! Routes declare which of the two they require with a `RoutePolicy`.
//!
//! ## Security Model
//! - Passwords hashed with Argon2id
//! - Cookies HMAC-signed, `HttpOnly`, `SameSite=Strict`
//! - One live session per user; re-login refreshes it

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::{SeedUseCase, SessionStore, TokenIssuer};
pub use error::{AuthError, AuthResult};
pub use infra::{MemoryIdentityStore, PgIdentityStore};
pub use presentation::router::{auth_router, auth_router_with_state};
pub use presentation::{AuthAppState, RequestContext, RoutePolicy};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
