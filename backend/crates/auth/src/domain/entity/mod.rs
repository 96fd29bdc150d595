//! Entity Module

pub mod role;
pub mod session;
pub mod user;

pub use role::{Permission, Role};
pub use session::SessionRecord;
pub use user::User;
