// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::Value;
use tracing::debug;

use crate::codec::{Map, get_map, get_str};
use crate::identity::Id;
use crate::message::secure::check_secure_fields;
use crate::message::{Envelope, MessageError, ReliableMessageDelegate, SecureMessage};

/// Secure message with the sender's signature over `data`, as sent over the wire.
///
/// May carry the sender's `meta` and `visa` so a receiver meeting the sender for the first time
/// can verify the message without a round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct ReliableMessage {
    envelope: Envelope,
}

impl ReliableMessage {
    pub(crate) const RELIABLE_FIELDS: [&'static str; 3] = ["signature", "meta", "visa"];

    pub(crate) fn from_envelope(envelope: Envelope) -> Self {
        Self { envelope }
    }

    /// Reads a reliable message map.
    ///
    /// A missing `signature` is accepted here and fails on [`ReliableMessage::verify`] instead.
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

    pub fn data(&self) -> &str {
        get_str(self.envelope.as_map(), "data").unwrap_or_default()
    }

    pub fn encrypted_key(&self) -> Option<&str> {
        get_str(self.envelope.as_map(), "key")
    }

    pub fn encrypted_keys(&self) -> Option<&Map> {
        get_map(self.envelope.as_map(), "keys")
    }

    pub fn signature(&self) -> Option<&str> {
        get_str(self.envelope.as_map(), "signature")
    }

    /// Meta of the sender, attached for the first contact.
    pub fn meta(&self) -> Option<&Map> {
        get_map(self.envelope.as_map(), "meta")
    }

    pub fn set_meta(&mut self, meta: Option<Map>) {
        self.set_attachment("meta", meta);
    }

    /// Visa of the sender, attached for the first contact.
    pub fn visa(&self) -> Option<&Map> {
        get_map(self.envelope.as_map(), "visa")
    }

    pub fn set_visa(&mut self, visa: Option<Map>) {
        self.set_attachment("visa", visa);
    }

    fn set_attachment(&mut self, key: &str, value: Option<Map>) {
        match value {
            Some(value) => self.envelope.insert(key, Value::Object(value)),
            None => {
                self.envelope.remove(key);
            }
        }
    }

    pub fn as_map(&self) -> &Map {
        self.envelope.as_map()
    }

    pub fn to_map(&self) -> Map {
        self.envelope.as_map().clone()
    }

    pub fn into_map(self) -> Map {
        self.envelope.into_map()
    }

    /// Checks the signature over the raw bytes of `data` against the sender's verification keys.
    ///
    /// Returns `None` when the signature is missing, malformed or doesn't verify.
    pub fn verify<D: ReliableMessageDelegate>(
        &self,
        delegate: &D,
    ) -> Result<Option<SecureMessage>, D::Error> {
        let envelope = &self.envelope;
        let sender = envelope.sender();

        let Some(signature) = self.signature() else {
            debug!(%sender, "message is not signed");
            return Ok(None);
        };
        let Some(signature) = delegate.decode_signature(signature, envelope) else {
            debug!(%sender, "failed to decode signature");
            return Ok(None);
        };
        let Some(data) = delegate.decode_data(self.data(), envelope) else {
            debug!(%sender, "failed to decode data");
            return Ok(None);
        };
        if !delegate.verify_data_signature(&data, &signature, envelope)? {
            debug!(%sender, receiver = %envelope.receiver(), "signature does not verify");
            return Ok(None);
        }

        let mut envelope = envelope.clone();
        for field in Self::RELIABLE_FIELDS {
            envelope.remove(field);
        }
        Ok(Some(SecureMessage::from_envelope(envelope)))
    }
}
