// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use crate::codec::Map;
use crate::crypto::traits::{CryptoProvider, PrivateKey, PublicKey, SymmetricKey};
use crate::crypto::{
    AES, AesKey, CryptoError, ED25519, Ed25519PrivateKey, Ed25519PublicKey, PLAIN, PlainKey, Rng,
    X25519, X25519PrivateKey, X25519PublicKey, key_algorithm,
};

/// Default key factory backed by a ChaCha20 random number generator.
#[derive(Debug, Default)]
pub struct Provider {
    rng: Arc<Rng>,
}

#[cfg(any(test, feature = "test_utils"))]
impl Provider {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Arc::new(Rng::from_seed(seed)),
        }
    }
}

impl Provider {
    pub fn rng(&self) -> &Rng {
        &self.rng
    }
}

impl CryptoProvider for Provider {
    fn generate_symmetric_key(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn SymmetricKey>, CryptoError> {
        match algorithm.to_ascii_uppercase().as_str() {
            AES => Ok(Arc::new(AesKey::generate(self.rng.clone()))),
            PLAIN => Ok(Arc::new(PlainKey)),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn generate_private_key(&self, algorithm: &str) -> Result<Arc<dyn PrivateKey>, CryptoError> {
        match algorithm.to_ascii_uppercase().as_str() {
            ED25519 => Ok(Arc::new(Ed25519PrivateKey::generate(&self.rng))),
            X25519 => Ok(Arc::new(X25519PrivateKey::generate(&self.rng))),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn parse_symmetric_key(&self, map: &Map) -> Result<Arc<dyn SymmetricKey>, CryptoError> {
        match key_algorithm(map)?.as_str() {
            AES => Ok(Arc::new(AesKey::from_map(map, self.rng.clone())?)),
            PLAIN => Ok(Arc::new(PlainKey)),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn parse_public_key(&self, map: &Map) -> Result<Arc<dyn PublicKey>, CryptoError> {
        match key_algorithm(map)?.as_str() {
            ED25519 => Ok(Arc::new(Ed25519PublicKey::from_map(map)?)),
            X25519 => Ok(Arc::new(X25519PublicKey::from_map(map)?)),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn parse_private_key(&self, map: &Map) -> Result<Arc<dyn PrivateKey>, CryptoError> {
        match key_algorithm(map)?.as_str() {
            ED25519 => Ok(Arc::new(Ed25519PrivateKey::from_map(map)?)),
            X25519 => Ok(Arc::new(X25519PrivateKey::from_map(map)?)),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}
