// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};

use crate::codec::{Map, get_f64, get_str};
use crate::content::ContentType;
use crate::identity::Id;
use crate::message::MessageError;
use crate::timestamp::now;

/// Routing header of a message: sender, receiver, time and the optional exposed group.
///
/// The envelope owns the whole message map. Message layers (`content`, `data`, `key`, `keys`,
/// `signature`, ...) live next to the routing fields, so unknown fields are kept as they are when
/// a message moves through its states. Sender and receiver are parsed once on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    map: Map,
    sender: Id,
    receiver: Id,
}

impl Envelope {
    /// Creates an envelope, `time` defaults to now.
    pub fn new(sender: Id, receiver: Id, time: Option<f64>) -> Self {
        let mut map = Map::new();
        map.insert("sender".into(), json!(sender.to_string()));
        map.insert("receiver".into(), json!(receiver.to_string()));
        map.insert("time".into(), json!(time.unwrap_or_else(now)));
        Self {
            map,
            sender,
            receiver,
        }
    }

    /// Reads sender and receiver from a message map.
    ///
    /// A missing receiver defaults to the broadcast identifier `anyone@anywhere`.
    pub fn from_map(mut map: Map) -> Result<Self, MessageError> {
        let sender = get_str(&map, "sender")
            .ok_or(MessageError::MissingField("sender"))
            .and_then(|id| Id::parse(id).map_err(|_| MessageError::InvalidId("sender")))?;

        let receiver = match get_str(&map, "receiver") {
            Some(id) => Id::parse(id).map_err(|_| MessageError::InvalidId("receiver"))?,
            None => {
                let receiver = Id::anyone();
                map.insert("receiver".into(), json!(receiver.to_string()));
                receiver
            }
        };

        Ok(Self {
            map,
            sender,
            receiver,
        })
    }

    pub fn sender(&self) -> &Id {
        &self.sender
    }

    pub fn receiver(&self) -> &Id {
        &self.receiver
    }

    pub(crate) fn set_receiver(&mut self, receiver: Id) {
        self.map
            .insert("receiver".into(), json!(receiver.to_string()));
        self.receiver = receiver;
    }

    pub fn time(&self) -> Option<f64> {
        get_f64(&self.map, "time")
    }

    /// Group exposed to routing stations, if any.
    pub fn group(&self) -> Option<Id> {
        get_str(&self.map, "group").and_then(|id| Id::parse(id).ok())
    }

    pub fn set_group(&mut self, group: Option<&Id>) {
        match group {
            Some(group) => {
                self.map.insert("group".into(), json!(group.to_string()));
            }
            None => {
                self.map.remove("group");
            }
        }
    }

    /// Content type hint, copied from the content by the packer.
    pub fn content_type(&self) -> Option<ContentType> {
        self.map.get("type").and_then(ContentType::from_value)
    }

    pub fn set_content_type(&mut self, content_type: Option<ContentType>) {
        match content_type {
            Some(content_type) => {
                self.map
                    .insert("type".into(), json!(content_type.to_string()));
            }
            None => {
                self.map.remove("type");
            }
        }
    }

    /// Returns true if the receiver or the exposed group is a broadcast identifier.
    pub fn is_broadcast(&self) -> bool {
        self.receiver.is_broadcast() || self.group().is_some_and(|group| group.is_broadcast())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    pub fn into_map(self) -> Map {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::codec::Map;
    use crate::content::ContentType;
    use crate::identity::Id;
    use crate::message::MessageError;

    use super::Envelope;

    #[test]
    fn missing_receiver_is_broadcast() {
        let mut map = Map::new();
        map.insert("sender".into(), json!("moky@anywhere"));

        let envelope = Envelope::from_map(map).unwrap();
        assert_eq!(envelope.receiver(), &Id::anyone());
        assert!(envelope.is_broadcast());
        assert_eq!(envelope.as_map().get("receiver"), Some(&json!("anyone@anywhere")));
    }

    #[test]
    fn missing_or_invalid_sender() {
        assert_matches!(
            Envelope::from_map(Map::new()),
            Err(MessageError::MissingField("sender"))
        );

        let mut map = Map::new();
        map.insert("sender".into(), json!("alice@aaa"));
        assert_matches!(
            Envelope::from_map(map),
            Err(MessageError::InvalidId("sender"))
        );
    }

    #[test]
    fn group_and_type_hints() {
        let mut envelope = Envelope::new(Id::founder(), Id::anyone(), Some(1700000000.0));
        assert_eq!(envelope.time(), Some(1700000000.0));
        assert_eq!(envelope.group(), None);

        envelope.set_group(Some(&Id::everyone()));
        envelope.set_content_type(Some(ContentType::TEXT));
        assert_eq!(envelope.group(), Some(Id::everyone()));
        assert_eq!(envelope.content_type(), Some(ContentType::TEXT));
        assert_eq!(envelope.as_map().get("type"), Some(&json!("1")));

        envelope.set_group(None);
        assert!(!envelope.as_map().contains_key("group"));
    }
}
