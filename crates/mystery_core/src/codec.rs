//! crates/mystery_core/src/codec.rs
//!
//! Authenticated encryption for the case solution. The sealed blob lives in
//! the same row as the public case data, so a client with read access to the
//! public fields must be computationally unable to recover the answer:
//! encryption substitutes for a separate access-control boundary.
//!
//! AES-256-GCM with a per-process key derived from the server secret by
//! Argon2 (fixed salt, deterministic output) and a fresh random nonce per
//! encryption call. Decryption fails closed: any tag mismatch, malformed
//! blob, or wrong key yields [`MysteryError::Decryption`], never partial
//! plaintext.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use serde::{Deserialize, Serialize};

use crate::domain::Solution;
use crate::ports::{MysteryError, MysteryResult};

const KEY_SALT: &[u8] = b"mystery-solution-codec";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The stored blob: ciphertext, authentication tag, and nonce, each
/// hex-encoded and bundled as one opaque JSON string.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedSolution {
    encrypted: String,
    auth_tag: String,
    iv: String,
}

/// Seals and opens solution payloads. Constructed once from configuration;
/// tests construct their own instances for per-test key isolation.
#[derive(Clone)]
pub struct SolutionCodec {
    cipher: Aes256Gcm,
}

impl SolutionCodec {
    /// Derives the process key from the server secret. Argon2 with a fixed
    /// salt keeps the derivation deterministic across restarts while staying
    /// deliberately slow against offline guessing.
    pub fn new(server_secret: &str) -> MysteryResult<Self> {
        let mut key = [0u8; 32];
        argon2::Argon2::default()
            .hash_password_into(server_secret.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| MysteryError::Store(format!("key derivation failed: {e}")))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| MysteryError::Store(format!("cipher init failed: {e}")))?;
        Ok(Self { cipher })
    }

    /// Encrypts a solution into an opaque string safe to persist alongside
    /// public case data.
    pub fn encrypt(&self, solution: &Solution) -> MysteryResult<String> {
        let plaintext = serde_json::to_vec(solution)
            .map_err(|e| MysteryError::Store(format!("solution serialization failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| MysteryError::Store("solution encryption failed".into()))?;

        // aes-gcm appends the 16-byte tag to the ciphertext; split it so the
        // blob carries ciphertext, tag, and nonce as independent fields.
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        let blob = SealedSolution {
            encrypted: hex::encode(&sealed),
            auth_tag: hex::encode(&tag),
            iv: hex::encode(nonce_bytes),
        };

        serde_json::to_string(&blob)
            .map_err(|e| MysteryError::Store(format!("blob serialization failed: {e}")))
    }

    /// Opens a sealed blob. Fails closed on any malformation or tag mismatch.
    pub fn decrypt(&self, blob: &str) -> MysteryResult<Solution> {
        let sealed: SealedSolution = serde_json::from_str(blob)
            .map_err(|e| MysteryError::Decryption(format!("malformed solution blob: {e}")))?;

        let ciphertext = hex::decode(&sealed.encrypted)
            .map_err(|e| MysteryError::Decryption(format!("bad ciphertext encoding: {e}")))?;
        let tag = hex::decode(&sealed.auth_tag)
            .map_err(|e| MysteryError::Decryption(format!("bad tag encoding: {e}")))?;
        let iv = hex::decode(&sealed.iv)
            .map_err(|e| MysteryError::Decryption(format!("bad nonce encoding: {e}")))?;

        if iv.len() != NONCE_LEN {
            return Err(MysteryError::Decryption(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(MysteryError::Decryption(format!(
                "tag must be {TAG_LEN} bytes, got {}",
                tag.len()
            )));
        }

        let mut combined = ciphertext;
        combined.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), combined.as_ref())
            .map_err(|_| MysteryError::Decryption("authentication failed".into()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| MysteryError::Decryption(format!("sealed payload is not a solution: {e}")))
    }
}
