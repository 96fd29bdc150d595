//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod login;
pub mod logout;
pub mod seed;
pub mod session_store;
pub mod sign_up;
pub mod token;

// Re-exports
pub use config::AuthConfig;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use seed::SeedUseCase;
pub use session_store::SessionStore;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use token::{TokenClaims, TokenIssuer};
