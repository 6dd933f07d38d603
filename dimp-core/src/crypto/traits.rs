// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces for the key material the message pipeline works with.
//!
//! Keys travel inside messages, metas and documents as string-keyed maps with an `algorithm` and a
//! base64 `data` field. A [`CryptoProvider`] turns these maps back into key objects and
//! manufactures fresh keys.
use std::fmt::Debug;
use std::sync::Arc;

use crate::codec::Map;
use crate::crypto::CryptoError;

/// Bytes encrypted and decrypted when comparing two symmetric keys.
const SAMPLE_PLAINTEXT: &[u8] = b"the quick panda jumps over the lazy dog";

pub trait CryptographyKey: Debug + Send + Sync {
    /// Name of the algorithm, for example `AES` or `ED25519`.
    fn algorithm(&self) -> &str;

    /// Map representation of this key as it goes over the wire.
    fn to_map(&self) -> Map;
}

pub trait SymmetricKey: CryptographyKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Returns true if data encrypted with this key can be decrypted with the other one.
    fn matches(&self, other: &dyn SymmetricKey) -> bool {
        let Ok(ciphertext) = self.encrypt(SAMPLE_PLAINTEXT) else {
            return false;
        };
        other
            .decrypt(&ciphertext)
            .is_ok_and(|plaintext| plaintext == SAMPLE_PLAINTEXT)
    }
}

pub trait PublicKey: CryptographyKey {
    /// Raw public key bytes.
    fn as_bytes(&self) -> &[u8];

    fn can_verify(&self) -> bool {
        false
    }

    fn verify(&self, _data: &[u8], _signature: &[u8]) -> bool {
        false
    }

    fn can_encrypt(&self) -> bool {
        false
    }

    fn encrypt(&self, _plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::UnsupportedOperation("encrypt"))
    }
}

pub trait PrivateKey: CryptographyKey {
    fn public_key(&self) -> Arc<dyn PublicKey>;

    fn can_sign(&self) -> bool {
        false
    }

    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::UnsupportedOperation("sign"))
    }

    fn can_decrypt(&self) -> bool {
        false
    }

    fn decrypt(&self, _ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::UnsupportedOperation("decrypt"))
    }
}

/// Factory for keys, implemented by the host or by the default [`Provider`].
///
/// [`Provider`]: crate::crypto::Provider
pub trait CryptoProvider: Send + Sync {
    fn generate_symmetric_key(&self, algorithm: &str)
    -> Result<Arc<dyn SymmetricKey>, CryptoError>;

    fn generate_private_key(&self, algorithm: &str) -> Result<Arc<dyn PrivateKey>, CryptoError>;

    fn parse_symmetric_key(&self, map: &Map) -> Result<Arc<dyn SymmetricKey>, CryptoError>;

    fn parse_public_key(&self, map: &Map) -> Result<Arc<dyn PublicKey>, CryptoError>;

    fn parse_private_key(&self, map: &Map) -> Result<Arc<dyn PrivateKey>, CryptoError>;
}
