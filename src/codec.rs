//! Reversible encoding of record keys for use in console URLs.
//!
//! A token is `nonce || ciphertext || tag` under AES-256-GCM, base64 encoded
//! and then percent-encoded so it fits in one path segment. The nonce is
//! derived from the secret and the key, so the same key always yields the
//! same token.
//!
//! The secret is distributed with the console. This hides raw keys in
//! addresses and nothing more: anyone holding the console can encode and
//! decode arbitrary keys.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lostfound_realtime::validate_key;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Secret used by deployed consoles unless configuration overrides it
pub const DEFAULT_SECRET: &str = "123456789";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token was not issued for this console")]
    Rejected,

    #[error("not a record key: {0}")]
    InvalidKey(String),

    #[error("cipher failure")]
    Cipher,
}

/// Encodes record keys into URL tokens and back
#[derive(Clone)]
pub struct IdCodec {
    key: [u8; 32],
}

impl std::fmt::Debug for IdCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCodec").finish_non_exhaustive()
    }
}

impl Default for IdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET)
    }
}

impl IdCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CodecError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| CodecError::Cipher)
    }

    fn nonce_for(&self, raw_key: &str) -> [u8; NONCE_LEN] {
        let digest = Sha256::new()
            .chain_update(self.key)
            .chain_update(b"lostfound-id")
            .chain_update(raw_key.as_bytes())
            .finalize();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        nonce
    }

    /// Token for `raw_key`, safe to use as a single path segment
    pub fn encode(&self, raw_key: &str) -> Result<String, CodecError> {
        validate_key(raw_key).map_err(|e| CodecError::InvalidKey(e.to_string()))?;

        let nonce_bytes = self.nonce_for(raw_key);
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), raw_key.as_bytes())
            .map_err(|_| CodecError::Cipher)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(urlencoding::encode(&STANDARD.encode(sealed)).into_owned())
    }

    /// Record key carried by `token`.
    ///
    /// Accepts the token both as it appears in a URL and already percent-decoded.
    pub fn decode(&self, token: &str) -> Result<String, CodecError> {
        let unescaped = urlencoding::decode(token.trim())
            .map_err(|_| CodecError::Malformed("percent-encoding is not UTF-8".into()))?;
        if unescaped.is_empty() {
            return Err(CodecError::Malformed("empty token".into()));
        }
        let sealed = STANDARD
            .decode(unescaped.as_bytes())
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        if sealed.len() <= NONCE_LEN + TAG_LEN {
            return Err(CodecError::Malformed(format!(
                "{} bytes is too short",
                sealed.len()
            )));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CodecError::Rejected)?;
        let raw_key = String::from_utf8(plaintext)
            .map_err(|_| CodecError::Malformed("key is not UTF-8".into()))?;

        if self.nonce_for(&raw_key) != nonce_bytes {
            return Err(CodecError::Rejected);
        }
        validate_key(&raw_key).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        Ok(raw_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostfound_realtime::PushIdGenerator;

    #[test]
    fn round_trips_store_keys() {
        let codec = IdCodec::default();
        let ids = PushIdGenerator::new();
        let mut keys: Vec<String> = (0..50).map(|_| ids.next_id()).collect();
        keys.extend(
            ["abc123", "a", "-_~", "Ünïcødé key", "with space", "x".repeat(300).as_str()]
                .iter()
                .map(|k| k.to_string()),
        );

        for key in keys {
            let token = codec.encode(&key).unwrap();
            assert_eq!(codec.decode(&token).unwrap(), key);
        }
    }

    #[test]
    fn tokens_are_single_path_segments() {
        let codec = IdCodec::default();
        for key in ["abc123", "-NkeyA1234567890abcd", "zzzzzzzzzzzzzzzzzzzz"] {
            let token = codec.encode(key).unwrap();
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.~%".contains(c)),
                "unexpected character in {}",
                token
            );
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = IdCodec::new("s3cret");
        assert_eq!(codec.encode("abc123"), codec.encode("abc123"));
        assert_ne!(codec.encode("abc123"), codec.encode("abc124"));
    }

    #[test]
    fn accepts_already_unescaped_token() {
        let codec = IdCodec::default();
        let token = codec.encode("abc123").unwrap();
        let unescaped = urlencoding::decode(&token).unwrap().into_owned();
        assert_eq!(codec.decode(&unescaped).unwrap(), "abc123");
    }

    #[test]
    fn rejects_token_from_other_secret() {
        let ours = IdCodec::default();
        let theirs = IdCodec::new("another secret");
        let token = theirs.encode("abc123").unwrap();
        assert_eq!(ours.decode(&token), Err(CodecError::Rejected));
    }

    #[test]
    fn rejects_foreign_tokens() {
        let codec = IdCodec::default();
        for token in ["", "abc123", "not%ZZbase64", "%E0%A4%A", "AAAA", "////"] {
            assert!(codec.decode(token).is_err(), "{:?} decoded", token);
        }

        let forged = STANDARD.encode([7u8; 40]);
        assert_eq!(
            codec.decode(&urlencoding::encode(&forged)),
            Err(CodecError::Rejected)
        );
    }

    #[test]
    fn rejects_tampered_token() {
        let codec = IdCodec::default();
        let token = codec.encode("abc123").unwrap();
        let mut sealed = STANDARD
            .decode(urlencoding::decode(&token).unwrap().as_bytes())
            .unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let tampered = urlencoding::encode(&STANDARD.encode(sealed)).into_owned();
        assert_eq!(codec.decode(&tampered), Err(CodecError::Rejected));
    }

    #[test]
    fn refuses_to_encode_invalid_keys() {
        let codec = IdCodec::default();
        assert!(matches!(codec.encode(""), Err(CodecError::InvalidKey(_))));
        assert!(matches!(codec.encode("a/b"), Err(CodecError::InvalidKey(_))));
    }
}
