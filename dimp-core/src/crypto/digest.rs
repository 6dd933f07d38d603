// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hashing functions used for address generation and key digests.
use sha2::{Digest, Sha256};

pub const SHA256_DIGEST_SIZE: usize = 32;

pub const BLAKE3_DIGEST_SIZE: usize = 32;

/// SHA2-256 hashing function.
pub fn sha256(messages: &[&[u8]]) -> [u8; SHA256_DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message);
    }
    let mut out = [0u8; SHA256_DIGEST_SIZE];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Double SHA2-256, used for address checksums.
pub fn sha256d(messages: &[&[u8]]) -> [u8; SHA256_DIGEST_SIZE] {
    sha256(&[&sha256(messages)])
}

/// BLAKE3 hashing function.
pub fn blake3(messages: &[&[u8]]) -> [u8; BLAKE3_DIGEST_SIZE] {
    let mut hasher = blake3::Hasher::new();
    for message in messages {
        hasher.update(message);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::{blake3, sha256, sha256d};

    #[test]
    fn concatenated_input() {
        assert_eq!(sha256(&[b"hello ", b"panda"]), sha256(&[b"hello panda"]));
        assert_eq!(blake3(&[b"hello ", b"panda"]), blake3(&[b"hello panda"]));
        assert_ne!(sha256d(&[b"hello"]), sha256(&[b"hello"]));
    }

    #[test]
    fn known_sha256() {
        assert_eq!(
            hex::encode(sha256(&[b"abc"])),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
