// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seedable source of secret key bytes and AEAD nonces.
use std::sync::{Mutex, PoisonError};

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

/// ChaCha20 stream shared by a [`Provider`] and the session keys it creates.
///
/// [`Provider`]: crate::crypto::Provider
#[derive(Debug)]
pub struct Rng(Mutex<ChaCha20Rng>);

impl Rng {
    /// Generator seeded by the operating system.
    pub fn from_entropy() -> Self {
        Self(Mutex::new(ChaCha20Rng::from_os_rng()))
    }

    /// Reproducible generator, every node in a test derives the same keys from the same seed.
    #[cfg(any(test, feature = "test_utils"))]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(Mutex::new(ChaCha20Rng::from_seed(seed)))
    }

    pub fn fill<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0; N];
        // The stream state stays consistent even if another holder panicked.
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        bytes
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::Rng;

    #[test]
    fn seeded_streams() {
        let nonce: [u8; 12] = Rng::from_seed([1; 32]).fill();
        assert_eq!(nonce, Rng::from_seed([1; 32]).fill::<12>());
        assert_ne!(nonce, Rng::from_seed([2; 32]).fill::<12>());

        // Consecutive draws advance the stream.
        let rng = Rng::from_seed([1; 32]);
        assert_ne!(rng.fill::<32>(), rng.fill::<32>());
    }
}
