// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edwards-Curve Digital Signature Algorithm (EdDSA) related to Curve25519 using SHA-512.
//!
//! Used as identity key in metas: it signs documents and messages but can not encrypt.
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::codec::Map;
use crate::crypto::rng::Rng;
use crate::crypto::secret::Secret;
use crate::crypto::traits::{CryptographyKey, PrivateKey, PublicKey};
use crate::crypto::{CryptoError, key_bytes, key_map};

pub const ED25519: &str = "ED25519";

pub const SIGNING_KEY_SIZE: usize = 32;

pub const VERIFYING_KEY_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: &[u8; VERIFYING_KEY_SIZE]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(key))
    }

    pub fn from_map(map: &Map) -> Result<Self, CryptoError> {
        Self::from_bytes(&key_bytes(map)?)
    }
}

impl CryptographyKey for Ed25519PublicKey {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn to_map(&self) -> Map {
        key_map(ED25519, self.0.as_bytes())
    }
}

impl PublicKey for Ed25519PublicKey {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn can_verify(&self) -> bool {
        true
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.0.verify(data, &signature).is_ok()
    }
}

#[derive(Clone, Debug)]
pub struct Ed25519PrivateKey(Secret<SIGNING_KEY_SIZE>);

impl Ed25519PrivateKey {
    pub fn generate(rng: &Rng) -> Self {
        Self(Secret::generate(rng))
    }

    pub fn from_map(map: &Map) -> Result<Self, CryptoError> {
        Ok(Self(Secret::from_key_map(map)?))
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(self.0.as_bytes())
    }
}

impl CryptographyKey for Ed25519PrivateKey {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn to_map(&self) -> Map {
        self.0.to_key_map(ED25519)
    }
}

impl PrivateKey for Ed25519PrivateKey {
    fn public_key(&self) -> Arc<dyn PublicKey> {
        Arc::new(Ed25519PublicKey(self.signing_key().verifying_key()))
    }

    fn can_sign(&self) -> bool {
        true
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signature = self
            .signing_key()
            .try_sign(data)
            .map_err(|_| CryptoError::SigningFailed)?;
        Ok(signature.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::rng::Rng;
    use crate::crypto::traits::{CryptographyKey, PrivateKey, PublicKey};

    use super::{Ed25519PrivateKey, Ed25519PublicKey};

    #[test]
    fn sign_and_verify() {
        let rng = Rng::from_seed([1; 32]);
        let private_key = Ed25519PrivateKey::generate(&rng);
        let public_key = private_key.public_key();

        let signature = private_key.sign(b"hello").unwrap();
        assert!(public_key.verify(b"hello", &signature));
        assert!(!public_key.verify(b"hola", &signature));
        assert!(!public_key.verify(b"hello", b"not a signature"));

        let other_key = Ed25519PrivateKey::generate(&rng);
        assert!(!other_key.public_key().verify(b"hello", &signature));
    }

    #[test]
    fn can_not_encrypt() {
        let rng = Rng::from_seed([1; 32]);
        let private_key = Ed25519PrivateKey::generate(&rng);
        assert!(!private_key.can_decrypt());
        assert!(!private_key.public_key().can_encrypt());
        assert!(private_key.public_key().encrypt(b"hello").is_err());
    }

    #[test]
    fn from_map() {
        let rng = Rng::from_seed([1; 32]);
        let private_key = Ed25519PrivateKey::generate(&rng);
        let public_key = private_key.public_key();

        let public_key_again = Ed25519PublicKey::from_map(&public_key.to_map()).unwrap();
        let private_key_again = Ed25519PrivateKey::from_map(&private_key.to_map()).unwrap();

        let signature = private_key_again.sign(b"hello").unwrap();
        assert!(public_key_again.verify(b"hello", &signature));
    }
}
