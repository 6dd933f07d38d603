// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material and the default cryptographic provider.
//!
//! Following algorithms are shipped with [`Provider`]:
//! * `AES`: AES-256-GCM session keys
//! * `PLAIN`: identity "cipher" for broadcast messages
//! * `ED25519`: EdDSA identity keys, used for metas and signatures
//! * `X25519`: HPKE (DHKEM-X25519, HKDF SHA256, ChaCha20Poly1305) visa keys to wrap session keys
mod aes;
pub mod digest;
mod ed25519;
mod hpke;
mod plain;
mod provider;
mod rng;
mod secret;
mod traits;
mod x25519;

use serde_json::json;
use thiserror::Error;

use crate::codec::{Map, base64_decode, base64_encode, get_str};

pub use aes::{AES, AesKey};
pub use ed25519::{ED25519, Ed25519PrivateKey, Ed25519PublicKey};
pub use hpke::HpkeError;
pub use plain::{PLAIN, PlainKey};
pub use provider::Provider;
pub use rng::Rng;
pub use traits::{CryptoProvider, CryptographyKey, PrivateKey, PublicKey, SymmetricKey};
pub use x25519::{X25519, X25519PrivateKey, X25519PublicKey};

/// Builds the wire representation `{algorithm, data}` of a key.
pub(crate) fn key_map(algorithm: &str, bytes: &[u8]) -> Map {
    let mut map = Map::new();
    map.insert("algorithm".into(), json!(algorithm));
    map.insert("data".into(), json!(base64_encode(bytes)));
    map
}

/// Reads the algorithm name of a key map, normalized to upper case.
pub fn key_algorithm(map: &Map) -> Result<String, CryptoError> {
    get_str(map, "algorithm")
        .map(str::to_ascii_uppercase)
        .ok_or(CryptoError::MissingField("algorithm"))
}

/// Reads the fixed-size key bytes of a key map.
pub(crate) fn key_bytes<const N: usize>(map: &Map) -> Result<[u8; N], CryptoError> {
    let data = get_str(map, "data").ok_or(CryptoError::MissingField("data"))?;
    let bytes = base64_decode(data).ok_or(CryptoError::InvalidKey)?;
    bytes.try_into().map_err(|_| CryptoError::InvalidKey)
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unsupported key algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("key map is missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid key data")]
    InvalidKey,

    #[error("key can not be used to {0}")]
    UnsupportedOperation(&'static str),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("signing failed")]
    SigningFailed,

    #[error(transparent)]
    Hpke(#[from] HpkeError),
}
