// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::codec::Map;
use crate::crypto::rng::Rng;
use crate::crypto::{CryptoError, key_bytes, key_map};

/// Bytes of a private or session key, wiped on drop and never printed.
#[derive(Clone)]
pub(crate) struct Secret<const N: usize>(Zeroizing<[u8; N]>);

impl<const N: usize> Secret<N> {
    pub(crate) fn generate(rng: &Rng) -> Self {
        Self(Zeroizing::new(rng.fill()))
    }

    pub(crate) fn from_key_map(map: &Map) -> Result<Self, CryptoError> {
        Ok(Self(Zeroizing::new(key_bytes(map)?)))
    }

    pub(crate) fn to_key_map(&self, algorithm: &str) -> Map {
        key_map(algorithm, self.as_bytes())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> PartialEq for Secret<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes()[..].ct_eq(&other.as_bytes()[..]).into()
    }
}

impl<const N: usize> Eq for Secret<N> {}

impl<const N: usize> fmt::Debug for Secret<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret<{N}>(..)")
    }
}
