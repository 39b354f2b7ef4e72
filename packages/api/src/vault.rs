//! Authenticated encryption for per-app environment variable bundles.
//!
//! AES-256-GCM with a fresh 96-bit nonce per encryption. Ciphertext layout:
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`. The map is serialized
//! through a sorted view so equal maps always produce equal plaintext.

use std::collections::{BTreeMap, HashMap};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::error::ApiError;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// Encrypt an environment-variable map with a 32-byte key.
pub fn encrypt(vars: &HashMap<String, String>, key: &str) -> Result<Vec<u8>, ApiError> {
    let key_bytes = key.as_bytes();
    if key_bytes.len() != 32 {
        return Err(ApiError::internal("encryption key must be 32 bytes"));
    }

    // Sorted view keeps serialization deterministic for identical maps.
    let ordered: BTreeMap<&String, &String> = vars.iter().collect();
    let plaintext = serde_json::to_vec(&ordered)
        .map_err(|e| ApiError::internal(format!("failed to serialize env vars: {e}")))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|_| ApiError::internal("encryption failed"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an environment-variable bundle. Empty input is the empty map.
pub fn decrypt(data: &[u8], key: &str) -> Result<HashMap<String, String>, ApiError> {
    if data.is_empty() {
        return Ok(HashMap::new());
    }

    let key_bytes = key.as_bytes();
    if key_bytes.len() != 32 {
        return Err(ApiError::internal("encryption key must be 32 bytes"));
    }

    if data.len() < NONCE_LEN {
        return Err(ApiError::internal("ciphertext too short"));
    }

    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| ApiError::internal("decryption failed"))?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| ApiError::internal(format!("failed to deserialize env vars: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const OTHER_KEY: &str = "fedcba9876543210fedcba9876543210";

    fn sample() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("DATABASE_URL".to_string(), "postgres://x".to_string());
        vars.insert("API_KEY".to_string(), "secret".to_string());
        vars
    }

    #[test]
    fn round_trip() {
        let vars = sample();
        let encrypted = encrypt(&vars, KEY).unwrap();
        let decrypted = decrypt(&encrypted, KEY).unwrap();
        assert_eq!(vars, decrypted);
    }

    #[test]
    fn empty_map_round_trip() {
        let vars = HashMap::new();
        let encrypted = encrypt(&vars, KEY).unwrap();
        let decrypted = decrypt(&encrypted, KEY).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn empty_input_decrypts_to_empty_map() {
        assert!(decrypt(&[], KEY).unwrap().is_empty());
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(encrypt(&sample(), "short").is_err());
        assert!(decrypt(b"0123456789abcdef", "short").is_err());
    }

    #[test]
    fn encryption_is_nondeterministic() {
        let vars = sample();
        let a = encrypt(&vars, KEY).unwrap();
        let b = encrypt(&vars, KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = encrypt(&sample(), KEY).unwrap();
        assert!(decrypt(&encrypted, OTHER_KEY).is_err());
    }

    #[test]
    fn tampering_fails() {
        let mut encrypted = encrypt(&sample(), KEY).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(decrypt(&encrypted, KEY).is_err());
    }

    #[test]
    fn too_short_fails() {
        assert!(decrypt(&[0u8; 8], KEY).is_err());
    }
}
