// SPDX-License-Identifier: MIT OR Apache-2.0

//! Factories reconstructing typed contents from received maps.
use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::trace;

use crate::codec::Map;
use crate::content::{
    ArrayContent, BaseCommand, BaseContent, CombineContent, Command, Content, ContentType,
    CustomizedContent, DocumentCommand, FileContent, ForwardContent, GroupCommand, MetaCommand,
    MoneyContent, NameCard, PageContent, QuoteContent, ReceiptCommand, TextContent, command_names,
    generate_sn, group_operations,
};
use crate::timestamp::now;

/// Builds a content from a map, taking ownership of it.
pub type ContentFactory = Box<dyn Fn(Map) -> Content + Send + Sync>;

/// Builds a command from a map, taking ownership of it.
pub type CommandFactory = Box<dyn Fn(Map) -> Command + Send + Sync>;

/// Content factories keyed by content type and command factories keyed by command name.
///
/// Registration happens before the first message is processed, parsing only reads from the
/// registry. [`ContentRegistry::default`] binds all standard contents and commands.
pub struct ContentRegistry {
    contents: HashMap<ContentType, ContentFactory>,
    commands: HashMap<String, CommandFactory>,
}

impl ContentRegistry {
    /// Creates a registry without any factories.
    pub fn new() -> Self {
        Self {
            contents: HashMap::new(),
            commands: HashMap::new(),
        }
    }

    pub fn register_content_factory(&mut self, content_type: ContentType, factory: ContentFactory) {
        self.contents.insert(content_type, factory);
    }

    pub fn register_command_factory(&mut self, name: &str, factory: CommandFactory) {
        self.commands.insert(name.to_string(), factory);
    }

    /// Reconstructs a content from its map.
    ///
    /// Maps without a type or without a factory for it go to the factory registered for
    /// [`ContentType::UNKNOWN`], or turn into [`Content::Unknown`] if there is none. Commands are
    /// dispatched a second time by their `command` name, falling back to the group command
    /// factory when the map carries a `group` and to a generic command otherwise.
    pub fn parse_content(&self, map: Map) -> Content {
        let content_type = map.get("type").and_then(ContentType::from_value);
        let factory = match content_type {
            Some(content_type) => self.contents.get(&content_type).or_else(|| {
                trace!(%content_type, "no factory for content type");
                self.contents.get(&ContentType::UNKNOWN)
            }),
            None => self.contents.get(&ContentType::UNKNOWN),
        };
        let Some(factory) = factory else {
            return unknown_content(map);
        };

        match factory(map) {
            Content::Command(command) => Content::Command(self.dispatch_command(command)),
            content => content,
        }
    }

    /// Reconstructs a command from its map, returns `None` if the map is not a command.
    pub fn parse_command(&self, map: Map) -> Option<Command> {
        match self.parse_content(map) {
            Content::Command(command) => Some(command),
            _ => None,
        }
    }

    fn dispatch_command(&self, command: Command) -> Command {
        let factory = self
            .commands
            .get(command.name())
            .or_else(|| match command.base().get("group") {
                Some(_) => self.commands.get(command_names::GROUP),
                None => None,
            });
        match factory {
            Some(factory) => factory(command.into_map()),
            None => command,
        }
    }
}

impl Default for ContentRegistry {
    fn default() -> Self {
        let mut registry = Self::new();

        registry.register_content_factory(ContentType::UNKNOWN, Box::new(unknown_content));
        registry.register_content_factory(
            ContentType::TEXT,
            Box::new(|map| Content::Text(TextContent::from_map(map))),
        );
        for content_type in [
            ContentType::FILE,
            ContentType::IMAGE,
            ContentType::AUDIO,
            ContentType::VIDEO,
        ] {
            registry.register_content_factory(
                content_type,
                Box::new(|map| Content::File(FileContent::from_map(map))),
            );
        }
        registry.register_content_factory(
            ContentType::PAGE,
            Box::new(|map| Content::Page(PageContent::from_map(map))),
        );
        registry.register_content_factory(
            ContentType::NAME_CARD,
            Box::new(|map| Content::NameCard(NameCard::from_map(map))),
        );
        registry.register_content_factory(
            ContentType::QUOTE,
            Box::new(|map| Content::Quote(QuoteContent::from_map(map))),
        );
        for content_type in [
            ContentType::MONEY,
            ContentType::TRANSFER,
            ContentType::CLAIM_PAYMENT,
            ContentType::SPLIT_BILL,
        ] {
            registry.register_content_factory(
                content_type,
                Box::new(|map| Content::Money(MoneyContent::from_map(map))),
            );
        }
        for content_type in [ContentType::COMMAND, ContentType::HISTORY] {
            registry.register_content_factory(
                content_type,
                Box::new(|map| Content::Command(Command::Generic(BaseCommand::from_map(map)))),
            );
        }
        registry.register_content_factory(
            ContentType::ARRAY,
            Box::new(|map| Content::Array(ArrayContent::from_map(map))),
        );
        registry.register_content_factory(
            ContentType::CUSTOMIZED,
            Box::new(|map| Content::Customized(CustomizedContent::from_map(map))),
        );
        registry.register_content_factory(
            ContentType::COMBINE_FORWARD,
            Box::new(|map| Content::Combine(CombineContent::from_map(map))),
        );
        registry.register_content_factory(
            ContentType::FORWARD,
            Box::new(|map| Content::Forward(ForwardContent::from_map(map))),
        );

        registry.register_command_factory(
            command_names::META,
            Box::new(|map| Command::Meta(MetaCommand::from_map(map))),
        );
        registry.register_command_factory(
            command_names::DOCUMENTS,
            Box::new(|map| Command::Documents(DocumentCommand::from_map(map))),
        );
        registry.register_command_factory(
            command_names::RECEIPT,
            Box::new(|map| Command::Receipt(ReceiptCommand::from_map(map))),
        );
        registry.register_command_factory(
            command_names::GROUP,
            Box::new(|map| Command::Group(GroupCommand::from_map(map))),
        );
        for operation in group_operations::ALL {
            registry.register_command_factory(
                operation,
                Box::new(|map| Command::Group(GroupCommand::from_map(map))),
            );
        }

        registry
    }
}

/// Wraps a map without known type, filling in missing type, serial number and time.
fn unknown_content(mut map: Map) -> Content {
    map.entry("type")
        .or_insert_with(|| json!(ContentType::UNKNOWN.to_string()));
    if !matches!(map.get("sn"), Some(Value::Number(_)) | Some(Value::String(_))) {
        map.insert("sn".into(), json!(generate_sn()));
    }
    map.entry("time").or_insert_with(|| json!(now()));
    Content::Unknown(BaseContent::from_map(map))
}
