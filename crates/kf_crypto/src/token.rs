//! Bearer tokens
//!
//! Stateless issue/validate pair over HMAC-signed JWTs. A token is a pure
//! bearer credential: possession alone grants the claimed identity's access,
//! and expiry is the only lifetime bound; there is no revocation list.
//!
//! Validation accepts exactly one algorithm (the configured one) and applies
//! zero clock-skew leeway: a token is invalid the second `exp` passes.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Identity claims carried by a token.
/// `iat`/`exp` are the issue and expiry times as Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub owner_id: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Supported signing algorithms (HMAC family only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenAlgorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl TokenAlgorithm {
    fn jwt(self) -> Algorithm {
        match self {
            TokenAlgorithm::Hs256 => Algorithm::HS256,
            TokenAlgorithm::Hs384 => Algorithm::HS384,
            TokenAlgorithm::Hs512 => Algorithm::HS512,
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("HS256") {
            Ok(TokenAlgorithm::Hs256)
        } else if s.eq_ignore_ascii_case("HS384") {
            Ok(TokenAlgorithm::Hs384)
        } else if s.eq_ignore_ascii_case("HS512") {
            Ok(TokenAlgorithm::Hs512)
        } else {
            Err(CryptoError::UnknownAlgorithm(s.to_string()))
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenAlgorithm::Hs256 => "HS256",
            TokenAlgorithm::Hs384 => "HS384",
            TokenAlgorithm::Hs512 => "HS512",
        };
        f.write_str(name)
    }
}

/// Issue a signed token for `owner_id`/`username`, valid for `ttl_hours`.
pub fn issue(
    owner_id: &str,
    username: &str,
    secret: &[u8],
    algorithm: TokenAlgorithm,
    ttl_hours: u64,
) -> Result<String, CryptoError> {
    let now = Utc::now();
    let expires = now + Duration::hours(ttl_hours as i64);
    let claims = TokenClaims {
        owner_id: owner_id.to_string(),
        username: username.to_string(),
        iat: now.timestamp(),
        exp: expires.timestamp(),
    };
    encode(
        &Header::new(algorithm.jwt()),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| CryptoError::TokenIssue(e.to_string()))
}

/// Validate a token and return its claims.
///
/// Malformed encoding, signature mismatch, algorithm mismatch and expiry all
/// collapse into the same `InvalidToken` error; callers cannot distinguish
/// why validation failed.
pub fn validate(
    token: &str,
    secret: &[u8],
    algorithm: TokenAlgorithm,
) -> Result<TokenClaims, CryptoError> {
    let mut validation = Validation::new(algorithm.jwt());
    // The library default tolerates 60 s of clock skew; this service does not.
    validation.leeway = 0;
    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|_| CryptoError::InvalidToken)
}
