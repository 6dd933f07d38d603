// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM session keys.
//!
//! Every call to `encrypt` draws a fresh 96-bit nonce which is prepended to the ciphertext, so one
//! cached session key can safely protect many messages of the same conversation.
use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::codec::Map;
use crate::crypto::rng::Rng;
use crate::crypto::secret::Secret;
use crate::crypto::traits::{CryptographyKey, SymmetricKey};
use crate::crypto::CryptoError;

pub const AES: &str = "AES";

/// 256-bit key size.
pub const KEY_SIZE: usize = 32;

/// 96-bit nonce size.
pub const NONCE_SIZE: usize = 12;

#[derive(Clone)]
pub struct AesKey {
    secret: Secret<KEY_SIZE>,
    rng: Arc<Rng>,
}

impl AesKey {
    pub fn generate(rng: Arc<Rng>) -> Self {
        let secret = Secret::generate(&rng);
        Self { secret, rng }
    }

    pub fn from_map(map: &Map, rng: Arc<Rng>) -> Result<Self, CryptoError> {
        let secret = Secret::from_key_map(map)?;
        Ok(Self { secret, rng })
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(self.secret.as_bytes()).map_err(|_| CryptoError::InvalidKey)
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKey")
            .field("secret", &self.secret)
            .finish()
    }
}

impl CryptographyKey for AesKey {
    fn algorithm(&self) -> &str {
        AES
    }

    fn to_map(&self) -> Map {
        self.secret.to_key_map(AES)
    }
}

impl SymmetricKey for AesKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce: [u8; NONCE_SIZE] = self.rng.fill();
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }
        let (nonce, ciphertext) = ciphertext.split_at(NONCE_SIZE);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
