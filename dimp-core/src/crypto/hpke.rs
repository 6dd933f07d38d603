// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid Public Key Encryption (HPKE) with DHKEM-X25519, HKDF SHA256 and ChaCha20Poly1305 AEAD
//! parameters.
//!
//! <https://www.rfc-editor.org/rfc/rfc9180>
use hpke_rs::{Hpke, HpkePrivateKey, HpkePublicKey, Mode};
use hpke_rs_crypto::types::{AeadAlgorithm, KdfAlgorithm, KemAlgorithm};
use hpke_rs_rust_crypto::HpkeRustCrypto;
use thiserror::Error;

/// Size of the encapsulated shared secret for DHKEM-X25519.
pub const KEM_OUTPUT_SIZE: usize = 32;

fn hpke() -> Hpke<HpkeRustCrypto> {
    Hpke::<HpkeRustCrypto>::new(
        Mode::Base,
        KemAlgorithm::DhKem25519,
        KdfAlgorithm::HkdfSha256,
        AeadAlgorithm::ChaCha20Poly1305,
    )
}

/// Encrypt a payload to a public key using HPKE.
///
/// The returned bytes are the encapsulated shared secret (KEM output) followed by the sealed
/// payload, so a wrapped key can travel as one base64 string.
pub fn hpke_seal(public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, HpkeError> {
    let mut hpke = hpke();
    let pk_r = HpkePublicKey::new(public_key.to_vec());
    let (kem_output, ciphertext) = hpke
        .seal(&pk_r, &[], &[], plaintext, None, None, None)
        .map_err(HpkeError::Encryption)?;

    let mut out = Vec::with_capacity(kem_output.len() + ciphertext.len());
    out.extend_from_slice(&kem_output);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a payload for a receiver holding the secret key using HPKE.
pub fn hpke_open(secret_key: &[u8], input: &[u8]) -> Result<Vec<u8>, HpkeError> {
    if input.len() < KEM_OUTPUT_SIZE {
        return Err(HpkeError::InvalidCiphertext);
    }
    let (kem_output, ciphertext) = input.split_at(KEM_OUTPUT_SIZE);

    let hpke = hpke();
    let sk_r = HpkePrivateKey::new(secret_key.to_vec());
    let plaintext = hpke
        .open(kem_output, &sk_r, &[], &[], ciphertext, None, None, None)
        .map_err(HpkeError::Decryption)?;
    Ok(plaintext)
}

#[derive(Debug, Error)]
pub enum HpkeError {
    #[error("could not encrypt with hpke: {0:?}")]
    Encryption(hpke_rs::HpkeError),

    #[error("could not decrypt with hpke: {0:?}")]
    Decryption(hpke_rs::HpkeError),

    #[error("hpke ciphertext is too short")]
    InvalidCiphertext,
}
