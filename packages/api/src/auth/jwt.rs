//! Session token issuance and validation, API token minting, OAuth state
//! nonces.
//!
//! Session tokens are HMAC-SHA-256 JWTs with a 15 minute access / 7 day
//! refresh lifetime and zero clock-skew tolerance. API tokens are opaque
//! `fgt_`-prefixed random values; only their SHA-256 digest is stored.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::ApiError;

pub const TOKEN_ISSUER: &str = "nexo-cloud";
pub const API_TOKEN_PREFIX: &str = "fgt_";

const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by both access and refresh tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// An access and refresh token pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

/// Issue a new access and refresh token pair for a user.
pub fn generate_token_pair(
    user_id: Uuid,
    username: &str,
    secret: &str,
) -> Result<TokenPair, ApiError> {
    if secret.len() < 32 {
        return Err(ApiError::internal("jwt secret must be at least 32 bytes"));
    }

    let now = Utc::now();
    let access_expiry = now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);
    let refresh_expiry = now + Duration::days(REFRESH_TOKEN_TTL_DAYS);
    let key = EncodingKey::from_secret(secret.as_bytes());

    let access_claims = Claims {
        user_id,
        username: username.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: access_expiry.timestamp(),
    };
    let access_token = encode(&Header::new(Algorithm::HS256), &access_claims, &key)
        .map_err(|e| ApiError::internal(format!("failed to sign access token: {e}")))?;

    let refresh_claims = Claims {
        exp: refresh_expiry.timestamp(),
        ..access_claims
    };
    let refresh_token = encode(&Header::new(Algorithm::HS256), &refresh_claims, &key)
        .map_err(|e| ApiError::internal(format!("failed to sign refresh token: {e}")))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_at: access_expiry,
        token_type: "Bearer".to_string(),
    })
}

/// Validate a session token and return its claims.
///
/// Rejects expired tokens, tokens signed with any non-HS256 algorithm and
/// tokens with an unknown signature. No clock-skew leeway.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Generate a new opaque API token: `fgt_` + 32 random bytes hex-encoded.
pub fn generate_api_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("{API_TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Generate a random OAuth state nonce (16 bytes, hex-encoded).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way digest of a token for storage and indexed lookup.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of a presented token against a stored digest.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let digest = hash_token(token);
    digest.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    #[test]
    fn token_pair_round_trip() {
        let user_id = Uuid::new_v4();
        let pair = generate_token_pair(user_id, "octocat", SECRET).unwrap();
        assert_eq!(pair.token_type, "Bearer");

        let claims = validate_token(&pair.access_token, SECRET).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "octocat");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.sub, user_id.to_string());

        let refresh = validate_token(&pair.refresh_token, SECRET).unwrap();
        assert!(refresh.exp > claims.exp);
    }

    #[test]
    fn short_secret_rejected() {
        assert!(generate_token_pair(Uuid::new_v4(), "u", "short").is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let pair = generate_token_pair(Uuid::new_v4(), "u", SECRET).unwrap();
        assert!(validate_token(&pair.access_token, "another-secret-also-long-enough!!").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let now = Utc::now();
        let claims = Claims {
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            iss: TOKEN_ISSUER.to_string(),
            sub: "s".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(validate_token("not-a-jwt", SECRET).is_err());
    }

    #[test]
    fn api_token_format() {
        let token = generate_api_token();
        assert!(token.starts_with(API_TOKEN_PREFIX));
        assert_eq!(token.len(), API_TOKEN_PREFIX.len() + 64);
        assert_ne!(token, generate_api_token());
    }

    #[test]
    fn state_is_sixteen_bytes_hex() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_hash_verification() {
        let token = generate_api_token();
        let hash = hash_token(&token);
        assert!(verify_token_hash(&token, &hash));
        assert!(!verify_token_hash(&generate_api_token(), &hash));
    }
}
