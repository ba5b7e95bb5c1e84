/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::{CacheError, Result};
use aes_gcm::{aead::Aead, aead::KeyInit, Aes256Gcm, Nonce};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};

const NONCE_LEN: usize = 12;

/// Hands out the per-identity symmetric key of a cache.
pub trait KeySource: Send + Sync {
    fn cache_key(&self) -> anyhow::Result<[u8; 32]>;
}

/// Fixed key, for tests and for callers that already unwrapped the key themselves.
pub struct StaticKey(pub [u8; 32]);

impl KeySource for StaticKey {
    fn cache_key(&self) -> anyhow::Result<[u8; 32]> {
        Ok(self.0)
    }
}

/// Used when payload encryption is off; asking it for a key is an error.
pub struct NoKey;

impl KeySource for NoKey {
    fn cache_key(&self) -> anyhow::Result<[u8; 32]> {
        anyhow::bail!("no key source configured")
    }
}

/// Serializes entity payloads to JSON and, when a key is present, seals them with
/// AES-256-GCM. Sealed blobs are `nonce || ciphertext`.
#[derive(Clone)]
pub struct PayloadCodec {
    cipher: Option<Aes256Gcm>,
}

impl PayloadCodec {
    pub fn plain() -> Self {
        Self { cipher: None }
    }

    pub fn sealed(key: &[u8; 32]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CacheError::Crypto(format!("aes key: {e}")))?;
        Ok(Self {
            cipher: Some(cipher),
        })
    }

    pub fn is_sealed(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let plaintext = serde_json::to_vec(value)?;
        let Some(cipher) = &self.cipher else {
            return Ok(plaintext);
        };
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|e| CacheError::Crypto(format!("aes-gcm encrypt: {e}")))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> Result<T> {
        let Some(cipher) = &self.cipher else {
            return Ok(serde_json::from_slice(blob)?);
        };
        if blob.len() < NONCE_LEN {
            return Err(CacheError::Crypto("sealed payload too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CacheError::Crypto(format!("aes-gcm decrypt: {e}")))?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payload {
        text: String,
    }

    #[test]
    fn sealed_payloads_do_not_leak_plaintext() {
        let codec = PayloadCodec::sealed(&[7u8; 32]).unwrap();
        let blob = codec
            .encode(&Payload {
                text: "secret toot".to_string(),
            })
            .unwrap();
        assert!(!blob.windows(6).any(|w| w == b"secret"));
        let back: Payload = codec.decode(&blob).unwrap();
        assert_eq!(back.text, "secret toot");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let blob = PayloadCodec::sealed(&[1u8; 32])
            .unwrap()
            .encode(&Payload {
                text: "x".to_string(),
            })
            .unwrap();
        let other = PayloadCodec::sealed(&[2u8; 32]).unwrap();
        assert!(matches!(
            other.decode::<Payload>(&blob),
            Err(CacheError::Crypto(_))
        ));
    }

    #[test]
    fn missing_key_source_is_an_error() {
        assert!(NoKey.cache_key().is_err());
    }
}
