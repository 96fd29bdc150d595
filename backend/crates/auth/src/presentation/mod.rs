//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::AuthAppState;
pub use middleware::{
    PolicyGuard, RequestContext, RoutePolicy, authorize, require_policy, require_session,
    require_token,
};
pub use router::{auth_router, auth_router_with_state};
