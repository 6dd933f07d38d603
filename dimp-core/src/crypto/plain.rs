// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity cipher used for broadcast messages.
use serde_json::json;

use crate::codec::Map;
use crate::crypto::CryptoError;
use crate::crypto::traits::{CryptographyKey, SymmetricKey};

pub const PLAIN: &str = "PLAIN";

/// Symmetric key which leaves data untouched.
///
/// Broadcast messages go through the same encryption path as private ones, the plain key makes
/// that path a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlainKey;

impl CryptographyKey for PlainKey {
    fn algorithm(&self) -> &str {
        PLAIN
    }

    fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("algorithm".into(), json!(PLAIN));
        map.insert("data".into(), json!(""));
        map
    }
}

impl SymmetricKey for PlainKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.to_vec())
    }
}
