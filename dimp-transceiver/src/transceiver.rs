// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use dimp_core::crypto::{CryptoError, CryptoProvider, Provider, SymmetricKey};
use dimp_core::{Content, ContentRegistry, Id, InstantMessage, ReliableMessage, SecureMessage};
use thiserror::Error;

use crate::barrack::{Barrack, BarrackError};
use crate::config::Config;
use crate::entity::{Group, User};
use crate::key_cache::KeyCache;
use crate::packer::{Packer, PackerError};
use crate::processor::{Processor, ProcessorRegistry};
use crate::transformer::Transformer;
use crate::traits::{DataSource, EntityFactory};

/// Entry point of the message pipeline for one node.
///
/// Owns the entity directory, the cipher-key cache and the registries. The transformer, packer
/// and processor are short-lived views borrowing from it, so every message is handled with the
/// same state.
///
/// ```ignore
/// let transceiver = Transceiver::builder(data_source).build();
/// let secure = transceiver.encrypt_message(&instant)?;
/// ```
pub struct Transceiver<S> {
    barrack: Barrack<S>,
    key_cache: KeyCache,
    registry: ContentRegistry,
    processors: ProcessorRegistry,
    config: Config,
}

impl<S> Transceiver<S>
where
    S: DataSource,
{
    pub fn builder(data_source: S) -> TransceiverBuilder<S> {
        TransceiverBuilder::new(data_source)
    }

    pub fn barrack(&self) -> &Barrack<S> {
        &self.barrack
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Delegate for the message types, usable as context argument of their operations.
    pub fn transformer(&self) -> Transformer<'_, S> {
        Transformer::new(&self.barrack, &self.key_cache, &self.registry)
    }

    pub fn packer(&self) -> Packer<'_, S> {
        Packer::new(self.transformer(), &self.config)
    }

    pub fn processor(&self) -> Processor<'_, S> {
        Processor::new(self.packer(), &self.processors)
    }

    // Packer

    pub fn encrypt_message(
        &self,
        instant: &InstantMessage,
    ) -> Result<Option<SecureMessage>, TransceiverError> {
        Ok(self.packer().encrypt_message(instant)?)
    }

    pub fn sign_message(
        &self,
        secure: &SecureMessage,
    ) -> Result<ReliableMessage, TransceiverError> {
        Ok(self.packer().sign_message(secure)?)
    }

    pub fn serialize_message(
        &self,
        reliable: &ReliableMessage,
    ) -> Result<Vec<u8>, TransceiverError> {
        Ok(self.packer().serialize_message(reliable)?)
    }

    pub fn deserialize_message(&self, data: &[u8]) -> Option<ReliableMessage> {
        self.packer().deserialize_message(data)
    }

    pub fn verify_message(
        &self,
        reliable: &ReliableMessage,
    ) -> Result<Option<SecureMessage>, TransceiverError> {
        Ok(self.packer().verify_message(reliable)?)
    }

    pub fn decrypt_message(
        &self,
        secure: &SecureMessage,
    ) -> Result<Option<InstantMessage>, TransceiverError> {
        Ok(self.packer().decrypt_message(secure)?)
    }

    // Processor

    pub fn process_data(&self, data: &[u8]) -> Result<Option<Vec<u8>>, TransceiverError> {
        Ok(self.processor().process_data(data)?)
    }

    pub fn process_reliable(
        &self,
        reliable: &ReliableMessage,
    ) -> Result<Option<ReliableMessage>, TransceiverError> {
        Ok(self.processor().process_reliable(reliable)?)
    }

    pub fn process_secure(
        &self,
        secure: &SecureMessage,
        reliable: &ReliableMessage,
    ) -> Result<Option<SecureMessage>, TransceiverError> {
        Ok(self.processor().process_secure(secure, reliable)?)
    }

    pub fn process_instant(
        &self,
        instant: &InstantMessage,
        reliable: &ReliableMessage,
    ) -> Result<Option<InstantMessage>, TransceiverError> {
        Ok(self.processor().process_instant(instant, reliable)?)
    }

    pub fn process_content(
        &self,
        content: &Content,
        reliable: &ReliableMessage,
    ) -> Option<Content> {
        self.processor().process_content(content, reliable)
    }

    // Directory

    pub fn get_user(&self, id: &Id) -> Option<Arc<User>> {
        self.barrack.get_user(id)
    }

    pub fn get_group(&self, id: &Id) -> Option<Arc<Group>> {
        self.barrack.get_group(id)
    }

    pub fn local_users(&self) -> Result<Vec<Id>, TransceiverError> {
        Ok(self.barrack.local_users()?)
    }

    pub fn select_local_user(&self, receiver: &Id) -> Result<Option<Id>, TransceiverError> {
        Ok(self.barrack.select_local_user(receiver)?)
    }

    /// Drops about half of the cached users and groups, returns how many are left.
    pub fn reduce_memory(&self) -> usize {
        self.barrack.reduce_memory()
    }

    // Cipher keys

    pub fn cipher_key(
        &self,
        sender: &Id,
        receiver: &Id,
        generate: bool,
    ) -> Result<Option<Arc<dyn SymmetricKey>>, TransceiverError> {
        Ok(self.key_cache.cipher_key(sender, receiver, generate)?)
    }

    pub fn cache_cipher_key(&self, sender: &Id, receiver: &Id, key: Arc<dyn SymmetricKey>) {
        self.key_cache.cache_cipher_key(sender, receiver, key);
    }
}

/// Wires a data source and optional collaborators into a [`Transceiver`].
///
/// Without further settings the transceiver uses the default crypto [`Provider`], a content
/// registry with all standard contents, no content processors and the default [`Config`].
pub struct TransceiverBuilder<S> {
    data_source: S,
    provider: Option<Arc<dyn CryptoProvider>>,
    registry: Option<ContentRegistry>,
    processors: ProcessorRegistry,
    factory: Option<Box<dyn EntityFactory>>,
    config: Config,
}

impl<S> TransceiverBuilder<S>
where
    S: DataSource,
{
    pub fn new(data_source: S) -> Self {
        Self {
            data_source,
            provider: None,
            registry: None,
            processors: ProcessorRegistry::default(),
            factory: None,
            config: Config::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn registry(mut self, registry: ContentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn processors(mut self, processors: ProcessorRegistry) -> Self {
        self.processors = processors;
        self
    }

    pub fn entity_factory(mut self, factory: Box<dyn EntityFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Transceiver<S> {
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(Provider::default()));

        let mut barrack = Barrack::new(self.data_source, provider.clone());
        if let Some(factory) = self.factory {
            barrack = barrack.with_factory(factory);
        }

        Transceiver {
            barrack,
            key_cache: KeyCache::new(provider, &self.config.symmetric_algorithm),
            registry: self.registry.unwrap_or_default(),
            processors: self.processors,
            config: self.config,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransceiverError {
    #[error(transparent)]
    Packer(#[from] PackerError),

    #[error(transparent)]
    Barrack(#[from] BarrackError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
