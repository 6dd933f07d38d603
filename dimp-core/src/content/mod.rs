// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message payloads.
//!
//! Every content is a string-keyed map with at least a `type`, a serial number `sn` and a `time`.
//! The map is the single source of truth: typed accessors read from it and setters write back into
//! it, so the canonical JSON form is always ready to be serialized and fields unknown to this
//! crate survive a round-trip.
//!
//! [`Content`] is a tagged union over the standard payloads, a [`ContentRegistry`] reconstructs it
//! from a map received over the wire.
mod basic;
mod command;
mod file;
mod forward;
mod registry;

use std::fmt;

use serde_json::{Value, json};

use crate::codec::{Map, get_f64, get_str};
use crate::identity::Id;
use crate::timestamp::now;

pub use basic::{
    CustomizedContent, MoneyContent, NameCard, PageContent, QuoteContent, TextContent,
};
pub use command::{
    BaseCommand, Command, DocumentCommand, GroupCommand, MetaCommand, ReceiptCommand,
    command_names, group_operations,
};
pub use file::FileContent;
pub use forward::{ArrayContent, CombineContent, ForwardContent};
pub use registry::{CommandFactory, ContentFactory, ContentRegistry};

/// Numeric type of a content, carried as decimal string in the `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType(u32);

impl ContentType {
    pub const UNKNOWN: Self = Self(0x00);
    pub const TEXT: Self = Self(0x01);
    pub const FILE: Self = Self(0x10);
    pub const IMAGE: Self = Self(0x12);
    pub const AUDIO: Self = Self(0x14);
    pub const VIDEO: Self = Self(0x16);
    pub const PAGE: Self = Self(0x20);
    pub const NAME_CARD: Self = Self(0x33);
    pub const QUOTE: Self = Self(0x37);
    pub const MONEY: Self = Self(0x40);
    pub const TRANSFER: Self = Self(0x41);
    pub const CLAIM_PAYMENT: Self = Self(0x48);
    pub const SPLIT_BILL: Self = Self(0x49);
    pub const COMMAND: Self = Self(0x88);
    pub const HISTORY: Self = Self(0x89);
    pub const ARRAY: Self = Self(0xCA);
    pub const CUSTOMIZED: Self = Self(0xCC);
    pub const COMBINE_FORWARD: Self = Self(0xCF);
    pub const FORWARD: Self = Self(0xFF);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Parses decimal (`"137"`) or hexadecimal (`"0x89"`) strings.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let number = match value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => value.parse().ok()?,
        };
        Some(Self(number))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()).map(Self),
            Value::String(value) => Self::parse(value),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        *self == Self::COMMAND || *self == Self::HISTORY
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random positive 31-bit serial number for a new content.
pub fn generate_sn() -> u64 {
    loop {
        let sn = rand::random::<u32>() & 0x7fff_ffff;
        if sn != 0 {
            return u64::from(sn);
        }
    }
}

/// Map-backed storage shared by all content variants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseContent {
    map: Map,
}

impl BaseContent {
    /// Creates a content of the given type with fresh serial number and time.
    pub fn new(content_type: ContentType) -> Self {
        let mut map = Map::new();
        map.insert("type".into(), json!(content_type.to_string()));
        map.insert("sn".into(), json!(generate_sn()));
        map.insert("time".into(), json!(now()));
        Self { map }
    }

    pub fn from_map(map: Map) -> Self {
        Self { map }
    }

    /// Type of this content, unknown when the field is missing or malformed.
    pub fn content_type(&self) -> ContentType {
        self.map
            .get("type")
            .and_then(ContentType::from_value)
            .unwrap_or(ContentType::UNKNOWN)
    }

    pub fn sn(&self) -> u64 {
        match self.map.get("sn") {
            Some(Value::Number(number)) => number.as_u64().unwrap_or_default(),
            Some(Value::String(value)) => value.parse().unwrap_or_default(),
            _ => 0,
        }
    }

    pub fn time(&self) -> Option<f64> {
        get_f64(&self.map, "time")
    }

    /// Group this content belongs to, if any.
    pub fn group(&self) -> Option<Id> {
        self.get_str("group").and_then(|id| Id::parse(id).ok())
    }

    pub fn set_group(&mut self, group: Option<&Id>) {
        match group {
            Some(group) => self.set("group", json!(group.to_string())),
            None => {
                self.remove("group");
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        get_str(&self.map, key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
    }

    /// Sets a string field or removes it when `None`.
    pub fn set_str(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set(key, json!(value)),
            None => {
                self.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    pub fn into_map(self) -> Map {
        self.map
    }
}

/// Declares a content variant wrapping a [`BaseContent`].
macro_rules! map_content {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name(crate::content::BaseContent);

        impl $name {
            pub fn from_map(map: crate::codec::Map) -> Self {
                Self(crate::content::BaseContent::from_map(map))
            }

            pub fn base(&self) -> &crate::content::BaseContent {
                &self.0
            }

            pub fn base_mut(&mut self) -> &mut crate::content::BaseContent {
                &mut self.0
            }

            pub fn content_type(&self) -> crate::content::ContentType {
                self.0.content_type()
            }

            pub fn sn(&self) -> u64 {
                self.0.sn()
            }

            pub fn group(&self) -> Option<crate::identity::Id> {
                self.0.group()
            }

            pub fn set_group(&mut self, group: Option<&crate::identity::Id>) {
                self.0.set_group(group)
            }

            pub fn as_map(&self) -> &crate::codec::Map {
                self.0.as_map()
            }

            pub fn into_map(self) -> crate::codec::Map {
                self.0.into_map()
            }
        }
    };
}

pub(crate) use map_content;

/// Payload of an instant message.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Text(TextContent),
    File(FileContent),
    Page(PageContent),
    NameCard(NameCard),
    Quote(QuoteContent),
    Money(MoneyContent),
    Forward(ForwardContent),
    Combine(CombineContent),
    Array(ArrayContent),
    Customized(CustomizedContent),
    Command(Command),
    Unknown(BaseContent),
}

impl Content {
    pub fn base(&self) -> &BaseContent {
        match self {
            Content::Text(content) => content.base(),
            Content::File(content) => content.base(),
            Content::Page(content) => content.base(),
            Content::NameCard(content) => content.base(),
            Content::Quote(content) => content.base(),
            Content::Money(content) => content.base(),
            Content::Forward(content) => content.base(),
            Content::Combine(content) => content.base(),
            Content::Array(content) => content.base(),
            Content::Customized(content) => content.base(),
            Content::Command(command) => command.base(),
            Content::Unknown(content) => content,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseContent {
        match self {
            Content::Text(content) => content.base_mut(),
            Content::File(content) => content.base_mut(),
            Content::Page(content) => content.base_mut(),
            Content::NameCard(content) => content.base_mut(),
            Content::Quote(content) => content.base_mut(),
            Content::Money(content) => content.base_mut(),
            Content::Forward(content) => content.base_mut(),
            Content::Combine(content) => content.base_mut(),
            Content::Array(content) => content.base_mut(),
            Content::Customized(content) => content.base_mut(),
            Content::Command(command) => command.base_mut(),
            Content::Unknown(content) => content,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.base().content_type()
    }

    pub fn sn(&self) -> u64 {
        self.base().sn()
    }

    pub fn time(&self) -> Option<f64> {
        self.base().time()
    }

    pub fn group(&self) -> Option<Id> {
        self.base().group()
    }

    pub fn set_group(&mut self, group: Option<&Id>) {
        self.base_mut().set_group(group);
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Content::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map {
        self.base().as_map()
    }

    pub fn to_map(&self) -> Map {
        self.as_map().clone()
    }

    pub fn into_map(self) -> Map {
        match self {
            Content::Text(content) => content.into_map(),
            Content::File(content) => content.into_map(),
            Content::Page(content) => content.into_map(),
            Content::NameCard(content) => content.into_map(),
            Content::Quote(content) => content.into_map(),
            Content::Money(content) => content.into_map(),
            Content::Forward(content) => content.into_map(),
            Content::Combine(content) => content.into_map(),
            Content::Array(content) => content.into_map(),
            Content::Customized(content) => content.into_map(),
            Content::Command(command) => command.into_map(),
            Content::Unknown(content) => content.into_map(),
        }
    }
}

macro_rules! impl_from_content {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Content {
                fn from(value: $ty) -> Self {
                    Content::$variant(value)
                }
            }
        )*
    };
}

impl_from_content!(
    Text(TextContent),
    File(FileContent),
    Page(PageContent),
    NameCard(NameCard),
    Quote(QuoteContent),
    Money(MoneyContent),
    Forward(ForwardContent),
    Combine(CombineContent),
    Array(ArrayContent),
    Customized(CustomizedContent),
    Command(Command),
);

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::codec::Map;
    use crate::identity::Id;

    use super::{BaseContent, ContentType, generate_sn};

    #[test]
    fn parse_content_types() {
        assert_eq!(ContentType::parse("1"), Some(ContentType::TEXT));
        assert_eq!(ContentType::parse("0x89"), Some(ContentType::HISTORY));
        assert_eq!(ContentType::parse("137"), Some(ContentType::HISTORY));
        assert_eq!(ContentType::parse("text"), None);
        assert_eq!(
            ContentType::from_value(&json!(0xCC)),
            Some(ContentType::CUSTOMIZED)
        );
        assert_eq!(ContentType::from_value(&Value::Null), None);
        assert!(ContentType::COMMAND.is_command());
        assert!(!ContentType::TEXT.is_command());
    }

    #[test]
    fn serial_numbers() {
        for _ in 0..100 {
            let sn = generate_sn();
            assert!(sn > 0 && sn <= 0x7fff_ffff);
        }
    }

    #[test]
    fn fresh_content() {
        let content = BaseContent::new(ContentType::TEXT);
        assert_eq!(content.content_type(), ContentType::TEXT);
        assert_eq!(content.get_str("type"), Some("1"));
        assert!(content.sn() > 0);
        assert!(content.time().is_some());
    }

    #[test]
    fn map_backed_fields() {
        let mut map = Map::new();
        map.insert("type".into(), json!("0x01"));
        map.insert("sn".into(), json!(1001));
        map.insert("custom".into(), json!({ "nested": true }));

        let mut content = BaseContent::from_map(map.clone());
        assert_eq!(content.content_type(), ContentType::TEXT);
        assert_eq!(content.sn(), 1001);

        content.set_group(Some(&Id::everyone()));
        assert_eq!(content.group(), Some(Id::everyone()));
        assert_eq!(content.get("custom"), map.get("custom"));

        content.set_group(None);
        assert_eq!(content.as_map(), &map);
    }
}
