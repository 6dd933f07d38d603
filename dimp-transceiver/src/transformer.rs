// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte-level glue between contents, keys and the string fields of a message.
use std::sync::Arc;

use dimp_core::codec::{
    EncodeError, base64_decode, base64_encode, json_decode_map, json_encode, utf8_decode,
};
use dimp_core::crypto::{CryptoError, SymmetricKey};
use dimp_core::message::{
    Envelope, InstantMessageDelegate, MessageError, ReliableMessageDelegate, SecureMessageDelegate,
};
use dimp_core::{Content, ContentRegistry, Id};
use thiserror::Error;
use tracing::{debug, trace};

use crate::barrack::Barrack;
use crate::key_cache::KeyCache;
use crate::traits::DataSource;

/// Implements the message delegates on top of the directory and the cipher-key cache.
///
/// Broadcast messages travel without any wrapped key and their `data` is the JSON content itself,
/// every other message carries base64 ciphertext.
pub struct Transformer<'a, S> {
    barrack: &'a Barrack<S>,
    key_cache: &'a KeyCache,
    registry: &'a ContentRegistry,
}

impl<'a, S> Transformer<'a, S>
where
    S: DataSource,
{
    pub fn new(
        barrack: &'a Barrack<S>,
        key_cache: &'a KeyCache,
        registry: &'a ContentRegistry,
    ) -> Self {
        Self {
            barrack,
            key_cache,
            registry,
        }
    }

    pub fn barrack(&self) -> &'a Barrack<S> {
        self.barrack
    }

    pub fn key_cache(&self) -> &'a KeyCache {
        self.key_cache
    }

    pub fn registry(&self) -> &'a ContentRegistry {
        self.registry
    }
}

/// Direction a received key belongs to: the exposed group if any, else the receiver.
fn key_direction(envelope: &Envelope) -> (Id, Id) {
    let receiver = envelope
        .group()
        .unwrap_or_else(|| envelope.receiver().clone());
    (envelope.sender().clone(), receiver)
}

impl<S> InstantMessageDelegate for Transformer<'_, S>
where
    S: DataSource,
{
    type Error = TransformerError;

    fn serialize_content(
        &self,
        content: &Content,
        _password: &dyn SymmetricKey,
        _envelope: &Envelope,
    ) -> Result<Vec<u8>, Self::Error> {
        Ok(json_encode(content.as_map())?)
    }

    fn encrypt_content(
        &self,
        data: &[u8],
        password: &dyn SymmetricKey,
        _envelope: &Envelope,
    ) -> Result<Vec<u8>, Self::Error> {
        Ok(password.encrypt(data)?)
    }

    fn encode_data(&self, data: &[u8], envelope: &Envelope) -> Result<String, Self::Error> {
        if envelope.is_broadcast() {
            return Ok(utf8_decode(data).ok_or(MessageError::InvalidData)?);
        }
        Ok(base64_encode(data))
    }

    fn serialize_key(
        &self,
        password: &dyn SymmetricKey,
        envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error> {
        if envelope.is_broadcast() {
            return Ok(None);
        }
        Ok(Some(json_encode(&password.to_map())?))
    }

    fn encrypt_key(
        &self,
        key: &[u8],
        receiver: &Id,
        _envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error> {
        let Some(public_key) = self.barrack.public_key_for_encryption(receiver) else {
            return Ok(None);
        };
        Ok(Some(public_key.encrypt(key)?))
    }

    fn encode_key(&self, key: &[u8], _envelope: &Envelope) -> String {
        base64_encode(key)
    }
}

impl<S> SecureMessageDelegate for Transformer<'_, S>
where
    S: DataSource,
{
    type Error = TransformerError;

    fn decode_key(&self, key: &str, _envelope: &Envelope) -> Option<Vec<u8>> {
        base64_decode(key)
    }

    fn decrypt_key(
        &self,
        key: &[u8],
        receiver: &Id,
        _envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error> {
        let private_keys = self.barrack.private_keys_for_decryption(receiver);
        if private_keys.is_empty() {
            debug!(%receiver, "no private key for decryption");
        }
        Ok(private_keys
            .iter()
            .find_map(|private_key| private_key.decrypt(key).ok()))
    }

    fn deserialize_key(
        &self,
        key: Option<&[u8]>,
        envelope: &Envelope,
    ) -> Result<Option<Arc<dyn SymmetricKey>>, Self::Error> {
        let (sender, receiver) = key_direction(envelope);
        if envelope.is_broadcast() {
            return Ok(self.key_cache.cipher_key(&sender, &receiver, false)?);
        }

        let Some(key) = key else {
            trace!(%sender, %receiver, "reusing cached cipher key");
            return Ok(self.key_cache.cipher_key(&sender, &receiver, false)?);
        };

        let Ok(map) = json_decode_map(key) else {
            debug!(%sender, "malformed symmetric key");
            return Ok(None);
        };
        match self.barrack.provider().parse_symmetric_key(&map) {
            Ok(password) => Ok(Some(password)),
            Err(err) => {
                debug!(%sender, %err, "unsupported symmetric key");
                Ok(None)
            }
        }
    }

    fn decode_data(&self, data: &str, envelope: &Envelope) -> Option<Vec<u8>> {
        if envelope.is_broadcast() {
            return Some(data.as_bytes().to_vec());
        }
        base64_decode(data)
    }

    fn decrypt_content(
        &self,
        data: &[u8],
        password: &dyn SymmetricKey,
        _envelope: &Envelope,
    ) -> Option<Vec<u8>> {
        password.decrypt(data).ok()
    }

    fn deserialize_content(
        &self,
        data: &[u8],
        password: &Arc<dyn SymmetricKey>,
        envelope: &Envelope,
    ) -> Result<Option<Content>, Self::Error> {
        let Ok(map) = json_decode_map(data) else {
            return Ok(None);
        };
        let content = self.registry.parse_content(map);

        if !envelope.is_broadcast() {
            let (sender, receiver) = key_direction(envelope);
            self.key_cache
                .cache_cipher_key(&sender, &receiver, password.clone());
        }

        Ok(Some(content))
    }

    fn sign_data(&self, data: &[u8], envelope: &Envelope) -> Result<Vec<u8>, Self::Error> {
        let sender = envelope.sender();
        let private_key = self
            .barrack
            .private_key_for_signature(sender)
            .ok_or_else(|| TransformerError::MissingSignKey(sender.clone()))?;
        Ok(private_key.sign(data)?)
    }

    fn encode_signature(&self, signature: &[u8], _envelope: &Envelope) -> String {
        base64_encode(signature)
    }
}

impl<S> ReliableMessageDelegate for Transformer<'_, S>
where
    S: DataSource,
{
    fn decode_signature(&self, signature: &str, _envelope: &Envelope) -> Option<Vec<u8>> {
        base64_decode(signature)
    }

    fn verify_data_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        envelope: &Envelope,
    ) -> Result<bool, Self::Error> {
        let sender = envelope.sender();
        let public_keys = self.barrack.public_keys_for_verification(sender);
        if public_keys.is_empty() {
            debug!(%sender, "verification keys not found");
        }
        Ok(public_keys
            .iter()
            .any(|public_key| public_key.verify(data, signature)))
    }
}

#[derive(Debug, Error)]
pub enum TransformerError {
    #[error("no private key to sign messages of {0}")]
    MissingSignKey(Id),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Message(#[from] MessageError),
}
