//! Infrastructure Layer
//!
//! Identity store implementations.

pub mod memory;
pub mod postgres;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;
