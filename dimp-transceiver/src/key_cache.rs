// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symmetric keys reused between messages of the same conversation.
use std::collections::HashMap;
use std::sync::Arc;

use dimp_core::Id;
use dimp_core::crypto::{CryptoError, CryptoProvider, PLAIN, SymmetricKey};
use parking_lot::RwLock;
use tracing::trace;

/// Symmetric keys by direction `(sender, receiver)`, where the receiver is a user or a group.
///
/// Broadcast directions always use the `PLAIN` key, which is never stored.
pub struct KeyCache {
    provider: Arc<dyn CryptoProvider>,
    algorithm: String,
    keys: RwLock<HashMap<(Id, Id), Arc<dyn SymmetricKey>>>,
}

impl KeyCache {
    /// Creates an empty cache generating fresh keys of the given algorithm.
    pub fn new(provider: Arc<dyn CryptoProvider>, algorithm: &str) -> Self {
        Self {
            provider,
            algorithm: algorithm.to_string(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up the key of a direction.
    ///
    /// With `generate` a fresh key is created and stored when none is cached.
    pub fn cipher_key(
        &self,
        sender: &Id,
        receiver: &Id,
        generate: bool,
    ) -> Result<Option<Arc<dyn SymmetricKey>>, CryptoError> {
        if sender.is_broadcast() || receiver.is_broadcast() {
            return self.provider.generate_symmetric_key(PLAIN).map(Some);
        }

        let direction = (sender.clone(), receiver.clone());
        if let Some(key) = self.keys.read().get(&direction) {
            return Ok(Some(key.clone()));
        }
        if !generate {
            return Ok(None);
        }

        let mut keys = self.keys.write();
        // Another caller might have generated the key in the meantime.
        if let Some(key) = keys.get(&direction) {
            return Ok(Some(key.clone()));
        }
        let key = self.provider.generate_symmetric_key(&self.algorithm)?;
        trace!(%sender, %receiver, algorithm = key.algorithm(), "generated cipher key");
        keys.insert(direction, key.clone());
        Ok(Some(key))
    }

    /// Stores the key of a direction, replacing any previous key. Broadcast keys are ignored.
    pub fn cache_cipher_key(&self, sender: &Id, receiver: &Id, key: Arc<dyn SymmetricKey>) {
        if sender.is_broadcast() || receiver.is_broadcast() {
            return;
        }
        self.keys
            .write()
            .insert((sender.clone(), receiver.clone()), key);
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dimp_core::Id;
    use dimp_core::crypto::{AES, CryptoProvider, PLAIN, Provider};
    use dimp_core::test_utils::Account;

    use super::KeyCache;

    #[test]
    fn generate_once_per_direction() {
        let provider = Arc::new(Provider::from_seed([1; 32]));
        let alice = Account::generate(&provider, "alice");
        let bob = Account::generate(&provider, "bob");
        let cache = KeyCache::new(provider, AES);

        assert!(cache.cipher_key(&alice.id, &bob.id, false).unwrap().is_none());

        let key = cache.cipher_key(&alice.id, &bob.id, true).unwrap().unwrap();
        let again = cache.cipher_key(&alice.id, &bob.id, false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&key, &again));
        assert_eq!(key.algorithm(), AES);

        // Directions are ordered.
        assert!(cache.cipher_key(&bob.id, &alice.id, false).unwrap().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_keys_replace_previous_ones() {
        let provider = Arc::new(Provider::from_seed([2; 32]));
        let alice = Account::generate(&provider, "alice");
        let bob = Account::generate(&provider, "bob");
        let cache = KeyCache::new(provider.clone(), AES);

        let first = cache.cipher_key(&alice.id, &bob.id, true).unwrap().unwrap();
        let second = provider.generate_symmetric_key(AES).unwrap();
        cache.cache_cipher_key(&alice.id, &bob.id, second.clone());

        let cached = cache.cipher_key(&alice.id, &bob.id, false).unwrap().unwrap();
        assert!(cached.matches(second.as_ref()));
        assert!(!cached.matches(first.as_ref()));
    }

    #[test]
    fn broadcast_is_plain_and_never_cached() {
        let provider = Arc::new(Provider::from_seed([3; 32]));
        let alice = Account::generate(&provider, "alice");
        let cache = KeyCache::new(provider.clone(), AES);

        let key = cache.cipher_key(&alice.id, &Id::anyone(), false).unwrap().unwrap();
        assert_eq!(key.algorithm(), PLAIN);
        assert_eq!(key.encrypt(b"hello").unwrap(), b"hello");

        let key = provider.generate_symmetric_key(AES).unwrap();
        cache.cache_cipher_key(&alice.id, &Id::everyone(), key);
        assert!(cache.is_empty());
    }
}
