// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};
use tracing::debug;

use crate::codec::{Map, get_map, get_str};
use crate::identity::Id;
use crate::message::{
    Envelope, InstantMessage, MessageError, ReliableMessage, SecureMessageDelegate,
};

/// Fields a secure message adds on top of the envelope.
pub(crate) const SECURE_FIELDS: [&str; 3] = ["data", "key", "keys"];

/// Envelope with encrypted content and the wrapped symmetric key.
#[derive(Clone, Debug, PartialEq)]
pub struct SecureMessage {
    envelope: Envelope,
}

impl SecureMessage {
    pub(crate) fn from_envelope(envelope: Envelope) -> Self {
        Self { envelope }
    }

    /// Reads a secure message map. `data` is required, `key` and `keys` exclude each other.
    pub fn from_map(map: Map) -> Result<Self, MessageError> {
        let envelope = Envelope::from_map(map)?;
        check_secure_fields(&envelope)?;
        Ok(Self { envelope })
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn sender(&self) -> &Id {
        self.envelope.sender()
    }

    pub fn receiver(&self) -> &Id {
        self.envelope.receiver()
    }

    pub fn group(&self) -> Option<Id> {
        self.envelope.group()
    }

    /// Encoded ciphertext of the content.
    pub fn data(&self) -> &str {
        get_str(self.envelope.as_map(), "data").unwrap_or_default()
    }

    /// Symmetric key wrapped for the single receiver.
    pub fn encrypted_key(&self) -> Option<&str> {
        get_str(self.envelope.as_map(), "key")
    }

    /// Symmetric keys wrapped per group member, plus the optional `digest`.
    pub fn encrypted_keys(&self) -> Option<&Map> {
        get_map(self.envelope.as_map(), "keys")
    }

    /// Short hash of the symmetric key, letting members check a cached key against the message.
    pub fn key_digest(&self) -> Option<&str> {
        self.encrypted_keys()
            .and_then(|keys| keys.get("digest"))
            .and_then(Value::as_str)
    }

    /// Adds `digest` to the `keys` map, a message without `keys` stays unchanged.
    pub fn set_key_digest(&mut self, digest: &str) {
        if let Some(Value::Object(mut keys)) = self.envelope.remove("keys") {
            keys.insert("digest".into(), json!(digest));
            self.envelope.insert("keys", Value::Object(keys));
        }
    }

    pub fn as_map(&self) -> &Map {
        self.envelope.as_map()
    }

    pub fn to_map(&self) -> Map {
        self.envelope.as_map().clone()
    }

    /// Decrypts the content for the receiver of this message.
    ///
    /// Group messages need to be narrowed to a local member with [`SecureMessage::trim`] first.
    /// Without attached key material the delegate falls back to a cached key. Returns `None` when
    /// any step fails to produce a value.
    pub fn decrypt<D: SecureMessageDelegate>(
        &self,
        delegate: &D,
    ) -> Result<Option<InstantMessage>, D::Error> {
        let envelope = &self.envelope;
        let receiver = envelope.receiver();

        let encrypted_key = self.encrypted_key().or_else(|| {
            self.encrypted_keys()
                .and_then(|keys| keys.get(receiver.as_str()))
                .and_then(Value::as_str)
        });
        let key = match encrypted_key {
            Some(encrypted_key) => {
                let Some(key) = delegate.decode_key(encrypted_key, envelope) else {
                    debug!(sender = %envelope.sender(), "failed to decode key");
                    return Ok(None);
                };
                let Some(key) = delegate.decrypt_key(&key, receiver, envelope)? else {
                    debug!(sender = %envelope.sender(), %receiver, "failed to decrypt key");
                    return Ok(None);
                };
                Some(key)
            }
            None => None,
        };

        let Some(password) = delegate.deserialize_key(key.as_deref(), envelope)? else {
            debug!(sender = %envelope.sender(), %receiver, "symmetric key not found");
            return Ok(None);
        };

        let Some(data) = delegate.decode_data(self.data(), envelope) else {
            debug!(sender = %envelope.sender(), "failed to decode data");
            return Ok(None);
        };
        let Some(data) = delegate.decrypt_content(&data, password.as_ref(), envelope) else {
            debug!(sender = %envelope.sender(), %receiver, "failed to decrypt content");
            return Ok(None);
        };
        let Some(content) = delegate.deserialize_content(&data, &password, envelope)? else {
            debug!(sender = %envelope.sender(), "failed to deserialize content");
            return Ok(None);
        };

        let mut envelope = envelope.clone();
        for field in SECURE_FIELDS
            .iter()
            .chain(ReliableMessage::RELIABLE_FIELDS.iter())
        {
            envelope.remove(field);
        }
        Ok(Some(InstantMessage::new(envelope, content)))
    }

    /// Signs the raw bytes of `data` with the sender's private key.
    pub fn sign<D: SecureMessageDelegate>(
        &self,
        delegate: &D,
    ) -> Result<ReliableMessage, D::Error> {
        let envelope = &self.envelope;
        let data = delegate
            .decode_data(self.data(), envelope)
            .ok_or(MessageError::InvalidData)?;
        let signature = delegate.sign_data(&data, envelope)?;
        let signature = delegate.encode_signature(&signature, envelope);

        let mut signed = envelope.clone();
        signed.insert("signature", json!(signature));
        Ok(ReliableMessage::from_envelope(signed))
    }

    /// Narrows a group message to one member.
    ///
    /// The member becomes the receiver and keeps only its own wrapped key. The original receiver is
    /// exposed as `group` unless the message already names one.
    pub fn trim(&self, member: &Id) -> SecureMessage {
        let mut envelope = self.envelope.clone();

        if let Some(Value::Object(keys)) = envelope.remove("keys") {
            if let Some(key) = keys.get(member.as_str()) {
                envelope.insert("key", key.clone());
            }
        }

        if envelope.group().is_none() {
            let group = envelope.receiver().clone();
            envelope.set_group(Some(&group));
        }
        envelope.set_receiver(member.clone());

        SecureMessage { envelope }
    }

    /// Narrows a group message once per member.
    pub fn split(&self, members: &[Id]) -> Vec<SecureMessage> {
        members.iter().map(|member| self.trim(member)).collect()
    }
}

pub(crate) fn check_secure_fields(envelope: &Envelope) -> Result<(), MessageError> {
    if get_str(envelope.as_map(), "data").is_none() {
        return Err(MessageError::MissingField("data"));
    }
    if envelope.get("key").is_some() && envelope.get("keys").is_some() {
        return Err(MessageError::ConflictingKeys);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::codec::Map;
    use crate::identity::{Address, EntityType, Id};
    use crate::message::MessageError;

    use super::SecureMessage;

    fn member(seed: u8) -> Id {
        Id::new(
            Some("member"),
            Address::generate(&[seed; 32], EntityType::USER),
            None,
        )
    }

    fn group() -> Id {
        Id::new(
            Some("team"),
            Address::generate(&[0xff; 32], EntityType::GROUP),
            None,
        )
    }

    fn map(value: serde_json::Value) -> Map {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn data_is_required() {
        assert_matches!(
            SecureMessage::from_map(map(json!({ "sender": "moky@anywhere" }))),
            Err(MessageError::MissingField("data"))
        );
    }

    #[test]
    fn key_and_keys_exclude_each_other() {
        assert_matches!(
            SecureMessage::from_map(map(json!({
                "sender": "moky@anywhere",
                "data": "AAAA",
                "key": "BBBB",
                "keys": {},
            }))),
            Err(MessageError::ConflictingKeys)
        );
    }

    #[test]
    fn trim_and_split() {
        let (alice, bob) = (member(1), member(2));
        let group = group();
        let mut message = SecureMessage::from_map(map(json!({
            "sender": "moky@anywhere",
            "receiver": group.to_string(),
            "data": "AAAA",
            "keys": {
                alice.to_string(): "a-key",
                bob.to_string(): "b-key",
            },
        })))
        .unwrap();
        message.set_key_digest("ZGlnZXN0");
        assert_eq!(message.key_digest(), Some("ZGlnZXN0"));

        let trimmed = message.trim(&bob);
        assert_eq!(trimmed.receiver(), &bob);
        assert_eq!(trimmed.group(), Some(group.clone()));
        assert_eq!(trimmed.encrypted_key(), Some("b-key"));
        assert!(trimmed.encrypted_keys().is_none());

        let messages = message.split(&[alice.clone(), bob.clone()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].receiver(), &alice);
        assert_eq!(messages[0].encrypted_key(), Some("a-key"));
        assert_eq!(messages[1], trimmed);
    }

    #[test]
    fn trim_keeps_exposed_group() {
        let group = group();
        let bob = member(2);
        let message = SecureMessage::from_map(map(json!({
            "sender": "moky@anywhere",
            "receiver": Id::everyone().to_string(),
            "group": group.to_string(),
            "data": "AAAA",
        })))
        .unwrap();

        let trimmed = message.trim(&bob);
        assert_eq!(trimmed.group(), Some(group));
        assert!(trimmed.encrypted_key().is_none());
    }
}
