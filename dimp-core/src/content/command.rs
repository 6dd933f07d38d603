// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands: contents of type `COMMAND` or `HISTORY` addressed by a `command` name.
use serde_json::{Value, json};

use crate::codec::{Map, get_f64};
use crate::content::{BaseContent, ContentType, map_content};
use crate::document::Document;
use crate::identity::Id;
use crate::message::Envelope;
use crate::meta::Meta;

/// Names of the standard commands.
pub mod command_names {
    pub const META: &str = "meta";
    pub const DOCUMENTS: &str = "documents";
    pub const RECEIPT: &str = "receipt";
    pub const GROUP: &str = "group";
}

/// Names of the group history commands.
pub mod group_operations {
    pub const FOUND: &str = "found";
    pub const ABDICATE: &str = "abdicate";
    pub const INVITE: &str = "invite";
    pub const EXPEL: &str = "expel";
    pub const JOIN: &str = "join";
    pub const QUIT: &str = "quit";
    pub const QUERY: &str = "query";
    pub const RESET: &str = "reset";
    pub const HIRE: &str = "hire";
    pub const FIRE: &str = "fire";
    pub const RESIGN: &str = "resign";

    pub const ALL: [&str; 11] = [
        FOUND, ABDICATE, INVITE, EXPEL, JOIN, QUIT, QUERY, RESET, HIRE, FIRE, RESIGN,
    ];
}

fn command_base(content_type: ContentType, name: &str) -> BaseContent {
    let mut base = BaseContent::new(content_type);
    base.set("command", json!(name));
    base
}

fn parse_id(base: &BaseContent, key: &str) -> Option<Id> {
    base.get_str(key).and_then(|id| Id::parse(id).ok())
}

map_content!(
    /// Command without a more specific variant.
    BaseCommand
);

impl BaseCommand {
    pub fn new(name: &str) -> Self {
        Self(command_base(ContentType::COMMAND, name))
    }

    pub fn name(&self) -> &str {
        self.0.get_str("command").unwrap_or_default()
    }
}

map_content!(
    /// Query for, or response with, the meta of an identifier.
    MetaCommand
);

impl MetaCommand {
    pub fn query(id: &Id) -> Self {
        let mut base = command_base(ContentType::COMMAND, command_names::META);
        base.set("ID", json!(id.to_string()));
        Self(base)
    }

    pub fn response(id: &Id, meta: &Meta) -> Self {
        let mut command = Self::query(id);
        command.0.set("meta", Value::Object(meta.to_map()));
        command
    }

    pub fn id(&self) -> Option<Id> {
        parse_id(&self.0, "ID")
    }

    pub fn meta(&self) -> Option<&Map> {
        self.0.get("meta").and_then(Value::as_object)
    }
}

map_content!(
    /// Query for, or response with, the documents of an identifier.
    DocumentCommand
);

impl DocumentCommand {
    /// Asks for documents newer than `last_time`.
    pub fn query(id: &Id, last_time: Option<f64>) -> Self {
        let mut base = command_base(ContentType::COMMAND, command_names::DOCUMENTS);
        base.set("ID", json!(id.to_string()));
        if let Some(last_time) = last_time {
            base.set("last_time", json!(last_time));
        }
        Self(base)
    }

    pub fn response(id: &Id, meta: Option<&Meta>, documents: &[Document]) -> Self {
        let mut base = command_base(ContentType::COMMAND, command_names::DOCUMENTS);
        base.set("ID", json!(id.to_string()));
        if let Some(meta) = meta {
            base.set("meta", Value::Object(meta.to_map()));
        }
        let documents = documents
            .iter()
            .map(|document| Value::Object(document.to_map()))
            .collect();
        base.set("documents", Value::Array(documents));
        Self(base)
    }

    pub fn id(&self) -> Option<Id> {
        parse_id(&self.0, "ID")
    }

    pub fn meta(&self) -> Option<&Map> {
        self.0.get("meta").and_then(Value::as_object)
    }

    pub fn last_time(&self) -> Option<f64> {
        get_f64(self.0.as_map(), "last_time")
    }

    pub fn documents(&self) -> Vec<Document> {
        self.0
            .get("documents")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|map| Document::from_map(map).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

map_content!(
    /// Delivery receipt, quoting the envelope and serial number of the original message.
    ReceiptCommand
);

impl ReceiptCommand {
    pub fn new(text: &str, envelope: Option<&Envelope>, sn: Option<u64>) -> Self {
        let mut base = command_base(ContentType::COMMAND, command_names::RECEIPT);
        base.set("text", json!(text));

        if let Some(envelope) = envelope {
            let mut origin = Map::new();
            origin.insert("sender".into(), json!(envelope.sender().to_string()));
            origin.insert("receiver".into(), json!(envelope.receiver().to_string()));
            if let Some(time) = envelope.time() {
                origin.insert("time".into(), json!(time));
            }
            if let Some(group) = envelope.group() {
                origin.insert("group".into(), json!(group.to_string()));
            }
            if let Some(sn) = sn {
                origin.insert("sn".into(), json!(sn));
            }
            base.set("origin", Value::Object(origin));
        }

        Self(base)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get_str("text")
    }

    pub fn origin(&self) -> Option<&Map> {
        self.0.get("origin").and_then(Value::as_object)
    }

    pub fn origin_sn(&self) -> Option<u64> {
        self.origin()?.get("sn").and_then(Value::as_u64)
    }
}

map_content!(
    /// Group history command changing membership or administration of a group.
    GroupCommand
);

impl GroupCommand {
    pub fn new(operation: &str, group: &Id, members: &[Id]) -> Self {
        let mut base = command_base(ContentType::HISTORY, operation);
        base.set("group", json!(group.to_string()));
        if !members.is_empty() {
            let members = members.iter().map(|id| json!(id.to_string())).collect();
            base.set("members", Value::Array(members));
        }
        Self(base)
    }

    pub fn operation(&self) -> &str {
        self.0.get_str("command").unwrap_or_default()
    }

    /// Members this command is about, single `member` entries included.
    pub fn members(&self) -> Vec<Id> {
        let mut members: Vec<Id> = self
            .0
            .get("members")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|id| Id::parse(id).ok())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(member) = parse_id(&self.0, "member") {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        members
    }
}

/// Command payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Meta(MetaCommand),
    Documents(DocumentCommand),
    Receipt(ReceiptCommand),
    Group(GroupCommand),
    Generic(BaseCommand),
}

impl Command {
    pub fn name(&self) -> &str {
        self.base().get_str("command").unwrap_or_default()
    }

    pub fn base(&self) -> &BaseContent {
        match self {
            Command::Meta(command) => command.base(),
            Command::Documents(command) => command.base(),
            Command::Receipt(command) => command.base(),
            Command::Group(command) => command.base(),
            Command::Generic(command) => command.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseContent {
        match self {
            Command::Meta(command) => command.base_mut(),
            Command::Documents(command) => command.base_mut(),
            Command::Receipt(command) => command.base_mut(),
            Command::Group(command) => command.base_mut(),
            Command::Generic(command) => command.base_mut(),
        }
    }

    pub fn into_map(self) -> Map {
        match self {
            Command::Meta(command) => command.into_map(),
            Command::Documents(command) => command.into_map(),
            Command::Receipt(command) => command.into_map(),
            Command::Group(command) => command.into_map(),
            Command::Generic(command) => command.into_map(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::content::ContentType;
    use crate::identity::Id;
    use crate::message::Envelope;

    use super::{Command, GroupCommand, ReceiptCommand, group_operations};

    #[test]
    fn group_command_members() {
        let group = Id::everyone();
        let command =
            GroupCommand::new(group_operations::INVITE, &group, &[Id::anyone(), Id::founder()]);
        assert_eq!(command.content_type(), ContentType::HISTORY);
        assert_eq!(command.operation(), "invite");
        assert_eq!(command.group(), Some(group));
        assert_eq!(command.members(), vec![Id::anyone(), Id::founder()]);

        let command = Command::Group(command);
        assert_eq!(command.name(), "invite");
    }

    #[test]
    fn receipt_origin() {
        let envelope = Envelope::new(Id::founder(), Id::anyone(), Some(1700000000.0));
        let receipt = ReceiptCommand::new("delivered", Some(&envelope), Some(1001));
        assert_eq!(receipt.text(), Some("delivered"));
        assert_eq!(receipt.origin_sn(), Some(1001));
        assert_eq!(
            receipt.origin().and_then(|origin| origin.get("receiver")),
            Some(&serde_json::json!("anyone@anywhere"))
        );
    }
}
