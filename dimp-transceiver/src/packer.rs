// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moves messages between their three states and to and from bytes.
use dimp_core::codec::{EncodeError, Map, base64_encode, json_decode_map, json_encode};
use dimp_core::crypto::digest::sha256;
use dimp_core::crypto::{CryptoError, SymmetricKey};
use dimp_core::{Content, Document, Id, InstantMessage, Meta, ReliableMessage, SecureMessage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::barrack::BarrackError;
use crate::config::{Config, WireFormat};
use crate::transformer::{Transformer, TransformerError};
use crate::traits::DataSource;

/// Number of trailing key hash bytes in a key digest.
const KEY_DIGEST_SIZE: usize = 6;

/// Field names and their single-letter aliases in the compact wire format.
///
/// `key` and `keys` share the alias `K`, a string expands to `key` and an object to `keys`.
const SHORT_KEYS: [(&str, &str); 9] = [
    ("sender", "S"),
    ("receiver", "R"),
    ("time", "W"),
    ("type", "T"),
    ("group", "G"),
    ("data", "D"),
    ("signature", "V"),
    ("meta", "M"),
    ("visa", "P"),
];

/// Group exposed in the envelope of a message carrying `content`.
///
/// Commands for a regular group are delivered to each member separately and never reveal the
/// group, broadcast groups are always exposed.
pub fn overt_group(content: &Content) -> Option<Id> {
    let group = content.group()?;
    if group.is_broadcast() {
        return Some(group);
    }
    if content.content_type().is_command() {
        return None;
    }
    Some(group)
}

/// Base64 of the last bytes of the SHA-256 hash over the serialized key.
pub fn key_digest(password: &dyn SymmetricKey) -> Result<String, EncodeError> {
    let bytes = json_encode(&password.to_map())?;
    let digest = sha256(&[&bytes]);
    Ok(base64_encode(&digest[digest.len() - KEY_DIGEST_SIZE..]))
}

/// Orchestrates the transitions of outgoing and incoming messages.
pub struct Packer<'a, S> {
    transformer: Transformer<'a, S>,
    config: &'a Config,
}

impl<'a, S> Packer<'a, S>
where
    S: DataSource,
{
    pub fn new(transformer: Transformer<'a, S>, config: &'a Config) -> Self {
        Self {
            transformer,
            config,
        }
    }

    pub fn transformer(&self) -> &Transformer<'a, S> {
        &self.transformer
    }

    /// Encrypts an instant message for its receiver.
    ///
    /// The symmetric key comes from the cipher-key cache, keyed by the exposed group if there is
    /// one and by the receiver otherwise. Messages for a group are encrypted for all members but
    /// the sender. Returns `None` while the group's membership or the encryption key of any
    /// receiver is unknown, the caller keeps the message and retries later.
    pub fn encrypt_message(
        &self,
        instant: &InstantMessage,
    ) -> Result<Option<SecureMessage>, PackerError> {
        let barrack = self.transformer.barrack();
        let sender = instant.sender();
        let receiver = instant.receiver();

        let group = overt_group(instant.content());
        let direction = group.as_ref().unwrap_or(receiver);
        let Some(password) = self
            .transformer
            .key_cache()
            .cipher_key(sender, direction, true)?
        else {
            return Ok(None);
        };

        let content_type = instant.content().content_type();
        let mut instant = instant.clone();
        let envelope = instant.envelope_mut();
        if let Some(group) = &group {
            envelope.set_group(Some(group));
        }
        envelope.set_content_type(Some(content_type));

        let is_group = receiver.is_group() && !instant.envelope().is_broadcast();
        let secure = if is_group {
            let members: Vec<Id> = barrack
                .members(receiver)
                .into_iter()
                .filter(|member| member != sender)
                .collect();
            if members.is_empty() {
                debug!(group = %receiver, "group not ready, members not found");
                return Ok(None);
            }
            instant.encrypt(password.as_ref(), Some(members.as_slice()), &self.transformer)?
        } else {
            instant.encrypt(password.as_ref(), None, &self.transformer)?
        };

        let Some(mut secure) = secure else {
            return Ok(None);
        };
        if is_group && self.config.attach_key_digest {
            secure.set_key_digest(&key_digest(password.as_ref())?);
        }
        Ok(Some(secure))
    }

    /// Signs a secure message, attaching the sender's meta and visa if configured.
    pub fn sign_message(&self, secure: &SecureMessage) -> Result<ReliableMessage, PackerError> {
        let mut reliable = secure.sign(&self.transformer)?;
        if self.config.attach_meta {
            let barrack = self.transformer.barrack();
            let sender = secure.sender();
            reliable.set_meta(barrack.meta(sender).map(|meta| meta.to_map()));
            reliable.set_visa(barrack.visa(sender).map(|visa| visa.to_map()));
        }
        Ok(reliable)
    }

    /// Encodes a reliable message as JSON in the configured wire format.
    pub fn serialize_message(&self, reliable: &ReliableMessage) -> Result<Vec<u8>, PackerError> {
        let map = match self.config.wire_format {
            WireFormat::Long => reliable.to_map(),
            WireFormat::Compact => compact_keys(reliable.to_map()),
        };
        Ok(json_encode(&map)?)
    }

    /// Decodes a reliable message in either wire format, `None` for malformed input.
    pub fn deserialize_message(&self, data: &[u8]) -> Option<ReliableMessage> {
        let map = match json_decode_map(data) {
            Ok(map) => map,
            Err(err) => {
                debug!(%err, "failed to decode message");
                return None;
            }
        };
        match ReliableMessage::from_map(expand_keys(map)) {
            Ok(reliable) => Some(reliable),
            Err(err) => {
                debug!(%err, "malformed message");
                None
            }
        }
    }

    /// Verifies the sender's signature.
    ///
    /// An attached meta and visa are stored first if they are valid for the sender, so a message
    /// of a new contact verifies without a query.
    pub fn verify_message(
        &self,
        reliable: &ReliableMessage,
    ) -> Result<Option<SecureMessage>, PackerError> {
        let barrack = self.transformer.barrack();
        let sender = reliable.sender();

        if let Some(meta) = reliable.meta() {
            match Meta::from_map(meta.clone(), barrack.provider()) {
                Ok(meta) => {
                    barrack.save_meta(&meta, sender);
                }
                Err(err) => warn!(%sender, %err, "invalid meta attached"),
            }
        }
        if let Some(visa) = reliable.visa() {
            match Document::from_map(visa) {
                Ok(visa) if visa.id() == sender => {
                    barrack.save_document(&visa);
                }
                Ok(visa) => warn!(%sender, id = %visa.id(), "visa of another entity attached"),
                Err(err) => warn!(%sender, %err, "invalid visa attached"),
            }
        }

        Ok(reliable.verify(&self.transformer)?)
    }

    /// Decrypts a secure message for a local user.
    ///
    /// A message for a group is narrowed to the first local member. Returns `None` when no local
    /// user is the receiver, the group's membership is unknown or decryption fails.
    pub fn decrypt_message(
        &self,
        secure: &SecureMessage,
    ) -> Result<Option<InstantMessage>, PackerError> {
        let receiver = secure.receiver();
        let Some(user) = self.transformer.barrack().select_local_user(receiver)? else {
            debug!(sender = %secure.sender(), %receiver, "receiver is not a local user");
            return Ok(None);
        };

        if receiver.is_group() && !receiver.is_broadcast() {
            return Ok(secure.trim(&user).decrypt(&self.transformer)?);
        }
        Ok(secure.decrypt(&self.transformer)?)
    }
}

fn compact_keys(map: Map) -> Map {
    map.into_iter()
        .map(|(key, value)| {
            let short = match key.as_str() {
                "key" | "keys" => Some("K"),
                long => SHORT_KEYS
                    .iter()
                    .find(|(name, _)| *name == long)
                    .map(|(_, alias)| *alias),
            };
            (short.map(str::to_string).unwrap_or(key), value)
        })
        .collect()
}

fn expand_keys(map: Map) -> Map {
    let mut expanded = Map::new();
    let mut aliased = Vec::new();
    for (key, value) in map {
        let long = match key.as_str() {
            "K" if value.is_object() => Some("keys"),
            "K" => Some("key"),
            short => SHORT_KEYS
                .iter()
                .find(|(_, alias)| *alias == short)
                .map(|(name, _)| *name),
        };
        match long {
            Some(long) => aliased.push((long.to_string(), value)),
            None => {
                expanded.insert(key, value);
            }
        }
    }
    // Full field names win over aliases.
    for (key, value) in aliased {
        expanded.entry(key).or_insert(value);
    }
    expanded
}

#[derive(Debug, Error)]
pub enum PackerError {
    #[error(transparent)]
    Transformer(#[from] TransformerError),

    #[error(transparent)]
    Barrack(#[from] BarrackError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[cfg(test)]
mod tests {
    use dimp_core::content::{Command, GroupCommand, TextContent, group_operations};
    use dimp_core::{Address, Content, EntityType, Id};
    use serde_json::json;

    use super::{compact_keys, expand_keys, overt_group};

    #[test]
    fn short_keys() {
        let map = json!({
            "sender": "moky@anywhere",
            "receiver": "anyone@anywhere",
            "data": "{}",
            "key": "abc",
            "sn": 1,
        });
        let compact = compact_keys(map.as_object().unwrap().clone());
        assert_eq!(
            serde_json::Value::Object(compact.clone()),
            json!({
                "S": "moky@anywhere",
                "R": "anyone@anywhere",
                "D": "{}",
                "K": "abc",
                "sn": 1,
            })
        );
        assert_eq!(&expand_keys(compact), map.as_object().unwrap());

        // Objects behind `K` are per-member keys.
        let map = json!({ "S": "moky@anywhere", "K": { "digest": "xyz" } });
        let expanded = expand_keys(map.as_object().unwrap().clone());
        assert_eq!(expanded.get("keys"), Some(&json!({ "digest": "xyz" })));
        assert!(!expanded.contains_key("key"));
    }

    #[test]
    fn long_keys_win() {
        let map = json!({ "sender": "moky@anywhere", "S": "anyone@anywhere" });
        let expanded = expand_keys(map.as_object().unwrap().clone());
        assert_eq!(expanded.get("sender"), Some(&json!("moky@anywhere")));
        assert_eq!(expanded.len(), 1);
    }

    #[test]
    fn exposed_groups() {
        let group = Id::new(Some("team"), Address::generate(&[1; 32], EntityType::GROUP), None);
        let members = [Id::founder()];

        let mut text: Content = TextContent::new("hi").into();
        assert_eq!(overt_group(&text), None);
        text.set_group(Some(&Id::everyone()));
        assert_eq!(overt_group(&text), Some(Id::everyone()));

        let command = GroupCommand::new(group_operations::INVITE, &group, &members);
        let command = Content::Command(Command::Group(command));
        assert_eq!(overt_group(&command), None);

        let command = GroupCommand::new(group_operations::INVITE, &Id::everyone(), &members);
        let command = Content::Command(Command::Group(command));
        assert_eq!(overt_group(&command), Some(Id::everyone()));
    }
}
