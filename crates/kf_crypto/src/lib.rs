//! Keyfort credential primitives.
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates
//!   (`argon2` for hashing, `jsonwebtoken` for bearer tokens).
//! - Transient password material is zeroized after use.
//! - Verification failures are opaque: callers learn that a check failed,
//!   never which part of it.
//!
//! # Module layout
//! - `password`: Argon2id master-password hashing + per-owner salts
//! - `token`:    signed, time-bound bearer tokens (HMAC JWS)
//! - `error`:    unified error type

pub mod error;
pub mod password;
pub mod token;

pub use error::CryptoError;
