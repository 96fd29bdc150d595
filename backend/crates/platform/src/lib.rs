//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, HMAC-SHA256, base64url)
//! - Password hashing and verification (Argon2id)
//! - Cookie management (signed values, Set-Cookie construction)
//! - Key-value storage with expiry (Redis, in-memory)

pub mod cookie;
pub mod crypto;
pub mod kv;
pub mod password;
