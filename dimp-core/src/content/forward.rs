// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};

use crate::codec::Map;
use crate::content::{BaseContent, Content, ContentRegistry, ContentType, map_content};
use crate::message::{InstantMessage, ReliableMessage};

fn object_list(value: Option<&Value>) -> Vec<Map> {
    value
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default()
}

map_content!(
    /// Forwards one or more signed messages, still encrypted for their original receivers.
    ForwardContent
);

impl ForwardContent {
    pub fn new(messages: &[ReliableMessage]) -> Self {
        let mut base = BaseContent::new(ContentType::FORWARD);
        if let [message] = messages {
            base.set("forward", Value::Object(message.to_map()));
        }
        let secrets = messages
            .iter()
            .map(|message| Value::Object(message.to_map()))
            .collect();
        base.set("secrets", Value::Array(secrets));
        Self(base)
    }

    /// Forwarded messages, malformed entries are skipped.
    pub fn secrets(&self) -> Vec<ReliableMessage> {
        let mut maps = object_list(self.0.get("secrets"));
        if maps.is_empty() {
            if let Some(Value::Object(map)) = self.0.get("forward") {
                maps.push(map.clone());
            }
        }
        maps.into_iter()
            .filter_map(|map| ReliableMessage::from_map(map).ok())
            .collect()
    }
}

map_content!(
    /// Chat history forwarded in clear, as a list of instant messages.
    CombineContent
);

impl CombineContent {
    pub fn new(title: &str, messages: &[InstantMessage]) -> Self {
        let mut base = BaseContent::new(ContentType::COMBINE_FORWARD);
        base.set("title", json!(title));
        let messages = messages
            .iter()
            .map(|message| Value::Object(message.to_map()))
            .collect();
        base.set("messages", Value::Array(messages));
        Self(base)
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get_str("title")
    }

    /// Combined messages, malformed entries are skipped.
    pub fn messages(&self, registry: &ContentRegistry) -> Vec<InstantMessage> {
        object_list(self.0.get("messages"))
            .into_iter()
            .filter_map(|map| InstantMessage::from_map(map, registry).ok())
            .collect()
    }
}

map_content!(
    /// Several contents of any type delivered together.
    ArrayContent
);

impl ArrayContent {
    pub fn new(contents: &[Content]) -> Self {
        let mut base = BaseContent::new(ContentType::ARRAY);
        let contents = contents
            .iter()
            .map(|content| Value::Object(content.to_map()))
            .collect();
        base.set("contents", Value::Array(contents));
        Self(base)
    }

    pub fn contents(&self, registry: &ContentRegistry) -> Vec<Content> {
        object_list(self.0.get("contents"))
            .into_iter()
            .map(|map| registry.parse_content(map))
            .collect()
    }
}
