// SPDX-License-Identifier: MIT OR Apache-2.0

//! Curve25519 keys for wrapping session keys with HPKE.
//!
//! Used as visa key: it encrypts towards a user but can not sign.
use std::sync::Arc;

use x25519_dalek::StaticSecret;

use crate::codec::Map;
use crate::crypto::hpke::{hpke_open, hpke_seal};
use crate::crypto::rng::Rng;
use crate::crypto::secret::Secret;
use crate::crypto::traits::{CryptographyKey, PrivateKey, PublicKey};
use crate::crypto::{CryptoError, key_bytes, key_map};

pub const X25519: &str = "X25519";

/// 256-bit secret key size.
pub const SECRET_KEY_SIZE: usize = 32;

/// 256-bit public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X25519PublicKey([u8; PUBLIC_KEY_SIZE]);

impl X25519PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_map(map: &Map) -> Result<Self, CryptoError> {
        Ok(Self(key_bytes(map)?))
    }
}

impl CryptographyKey for X25519PublicKey {
    fn algorithm(&self) -> &str {
        X25519
    }

    fn to_map(&self) -> Map {
        key_map(X25519, &self.0)
    }
}

impl PublicKey for X25519PublicKey {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn can_encrypt(&self) -> bool {
        true
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(hpke_seal(&self.0, plaintext)?)
    }
}

#[derive(Clone, Debug)]
pub struct X25519PrivateKey(Secret<SECRET_KEY_SIZE>);

impl X25519PrivateKey {
    pub fn generate(rng: &Rng) -> Self {
        Self(Secret::generate(rng))
    }

    pub fn from_map(map: &Map) -> Result<Self, CryptoError> {
        Ok(Self(Secret::from_key_map(map)?))
    }
}

impl CryptographyKey for X25519PrivateKey {
    fn algorithm(&self) -> &str {
        X25519
    }

    fn to_map(&self) -> Map {
        self.0.to_key_map(X25519)
    }
}

impl PrivateKey for X25519PrivateKey {
    fn public_key(&self) -> Arc<dyn PublicKey> {
        let secret = StaticSecret::from(*self.0.as_bytes());
        let public_key = x25519_dalek::PublicKey::from(&secret);
        Arc::new(X25519PublicKey(public_key.to_bytes()))
    }

    fn can_decrypt(&self) -> bool {
        true
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(hpke_open(self.0.as_bytes(), ciphertext)?)
    }
}
