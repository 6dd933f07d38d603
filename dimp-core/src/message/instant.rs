// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};
use tracing::debug;

use crate::codec::Map;
use crate::content::{Content, ContentRegistry};
use crate::crypto::SymmetricKey;
use crate::identity::Id;
use crate::message::{Envelope, InstantMessageDelegate, MessageError, SecureMessage};

/// Envelope with cleartext content.
#[derive(Clone, Debug, PartialEq)]
pub struct InstantMessage {
    envelope: Envelope,
    content: Content,
}

impl InstantMessage {
    pub fn new(envelope: Envelope, content: Content) -> Self {
        Self { envelope, content }
    }

    /// Reads an instant message map, reconstructing the content through the registry.
    pub fn from_map(mut map: Map, registry: &ContentRegistry) -> Result<Self, MessageError> {
        let content = match map.remove("content") {
            Some(Value::Object(content)) => registry.parse_content(content),
            _ => return Err(MessageError::MissingField("content")),
        };
        let envelope = Envelope::from_map(map)?;
        Ok(Self { envelope, content })
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn sender(&self) -> &Id {
        self.envelope.sender()
    }

    pub fn receiver(&self) -> &Id {
        self.envelope.receiver()
    }

    pub fn time(&self) -> Option<f64> {
        self.envelope.time()
    }

    pub fn group(&self) -> Option<Id> {
        self.envelope.group()
    }

    pub fn to_map(&self) -> Map {
        let mut map = self.envelope.as_map().clone();
        map.insert("content".into(), Value::Object(self.content.to_map()));
        map
    }

    /// Encrypts the content with `password` and wraps the key for the receiver.
    ///
    /// With `members` the key is wrapped for every member into a `keys` map, otherwise once for
    /// the receiver into `key`. No key is attached when the delegate doesn't serialize one, which
    /// is the case for broadcast messages. Returns `None` when the encryption key of any receiver
    /// is unknown, the caller keeps the message and retries once the key is available.
    pub fn encrypt<D: InstantMessageDelegate>(
        &self,
        password: &dyn SymmetricKey,
        members: Option<&[Id]>,
        delegate: &D,
    ) -> Result<Option<SecureMessage>, D::Error> {
        let envelope = &self.envelope;

        let data = delegate.serialize_content(&self.content, password, envelope)?;
        let data = delegate.encrypt_content(&data, password, envelope)?;
        let data = delegate.encode_data(&data, envelope)?;

        let mut secure = envelope.clone();
        secure.insert("data", json!(data));

        let Some(key) = delegate.serialize_key(password, envelope)? else {
            return Ok(Some(SecureMessage::from_envelope(secure)));
        };

        match members {
            None => {
                let receiver = envelope.receiver();
                let Some(encrypted) = delegate.encrypt_key(&key, receiver, envelope)? else {
                    debug!(%receiver, "encryption key not found");
                    return Ok(None);
                };
                secure.insert("key", json!(delegate.encode_key(&encrypted, envelope)));
            }
            Some(members) => {
                let mut keys = Map::new();
                for member in members {
                    let Some(encrypted) = delegate.encrypt_key(&key, member, envelope)? else {
                        debug!(%member, group = %envelope.receiver(), "encryption key not found");
                        return Ok(None);
                    };
                    keys.insert(
                        member.to_string(),
                        json!(delegate.encode_key(&encrypted, envelope)),
                    );
                }
                secure.insert("keys", Value::Object(keys));
            }
        }

        Ok(Some(SecureMessage::from_envelope(secure)))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::content::{ContentRegistry, ContentType, TextContent};
    use crate::identity::Id;
    use crate::message::{Envelope, MessageError};

    use super::InstantMessage;

    #[test]
    fn map_round_trip() {
        let registry = ContentRegistry::default();
        let envelope = Envelope::new(Id::founder(), Id::anyone(), Some(1700000000.0));
        let message = InstantMessage::new(envelope, TextContent::new("hi").into());

        let map = message.to_map();
        assert_eq!(map.get("sender"), Some(&json!("moky@anywhere")));
        assert_eq!(
            map.get("content").and_then(|content| content.get("text")),
            Some(&json!("hi"))
        );

        let parsed = InstantMessage::from_map(map, &registry).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.content().content_type(), ContentType::TEXT);
    }

    #[test]
    fn content_is_required() {
        let registry = ContentRegistry::default();
        let envelope = Envelope::new(Id::founder(), Id::anyone(), None);
        assert_matches!(
            InstantMessage::from_map(envelope.into_map(), &registry),
            Err(MessageError::MissingField("content"))
        );
    }
}
