//! Master-password hashing.
//!
//! `hash_master_password` runs Argon2id over password + owner salt, producing
//! a PHC string that embeds its own fresh 16-byte hashing salt (so two hashes
//! of the same input never compare equal as strings).
//!
//! `verify_master_password` recomputes and compares in constant time.
//!
//! `generate_salt` makes the per-owner salt stored next to the hash. It is
//! appended to the password before hashing and is never reused across owners.

use argon2::{
    password_hash::{Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CryptoError;

// ── Cost parameters ──────────────────────────────────────────────────────────
// Fixed deployment constants; changing them invalidates no stored hash (each
// PHC string carries the parameters it was produced with).

/// Argon2 memory cost in KiB (64 MiB).
pub const MEMORY_COST_KIB: u32 = 64 * 1024;
/// Argon2 iteration count.
pub const TIME_COST: u32 = 3;
/// Argon2 lane count.
pub const PARALLELISM: u32 = 4;
/// Digest length in bytes.
pub const OUTPUT_LEN: usize = 32;
/// Per-owner salt length in bytes (hex-encoded to 64 chars for storage).
pub const SALT_BYTES: usize = 32;

fn argon2() -> Argon2<'static> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .expect("Static Argon2 params are always valid");
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
}

/// Password + owner salt, concatenated into one wiped-on-drop buffer.
fn salted_input(password: &str, salt: &str) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(Vec::with_capacity(password.len() + salt.len()));
    buf.extend_from_slice(password.as_bytes());
    buf.extend_from_slice(salt.as_bytes());
    buf
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Generate a fresh per-owner salt: 32 random bytes, hex-encoded.
/// Stored alongside the hash (not secret), one per owner, never reused.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a master password with the owner's salt.
///
/// Returns a PHC string (`$argon2id$v=19$...`). Repeated calls on identical
/// inputs produce different strings (the hashing salt inside the PHC string
/// is drawn fresh each call), and all of them verify.
pub fn hash_master_password(password: &str, salt: &str) -> Result<String, CryptoError> {
    let salted = salted_input(password, salt);
    let hashing_salt = SaltString::generate(&mut rand::rngs::OsRng);
    argon2()
        .hash_password(&salted, &hashing_salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::Hashing(e.to_string()))
}

/// Verify a master password against a stored PHC hash string.
///
/// `Ok(false)` means the password does not match. A stored hash that cannot
/// be parsed, or that was produced by a different algorithm or version, is an
/// error, never a silent `false`.
pub fn verify_master_password(
    password: &str,
    salt: &str,
    stored_hash: &str,
) -> Result<bool, CryptoError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;
    let salted = salted_input(password, salt);
    match argon2().verify_password(&salted, &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(CryptoError::MalformedHash(e.to_string())),
    }
}
