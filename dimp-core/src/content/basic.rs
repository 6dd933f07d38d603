// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};

use crate::codec::{Map, get_f64};
use crate::content::{BaseContent, Content, ContentType, map_content};
use crate::identity::Id;
use crate::message::Envelope;

map_content!(
    /// Plain text message.
    TextContent
);

impl TextContent {
    pub fn new(text: &str) -> Self {
        let mut base = BaseContent::new(ContentType::TEXT);
        base.set("text", json!(text));
        Self(base)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get_str("text")
    }
}

map_content!(
    /// Preview of a web page.
    PageContent
);

impl PageContent {
    pub fn new(url: &str, title: &str, desc: Option<&str>, icon: Option<&str>) -> Self {
        let mut base = BaseContent::new(ContentType::PAGE);
        base.set("URL", json!(url));
        base.set("title", json!(title));
        base.set_str("desc", desc);
        base.set_str("icon", icon);
        Self(base)
    }

    pub fn url(&self) -> Option<&str> {
        self.0.get_str("URL")
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get_str("title")
    }

    pub fn desc(&self) -> Option<&str> {
        self.0.get_str("desc")
    }

    pub fn icon(&self) -> Option<&str> {
        self.0.get_str("icon")
    }
}

map_content!(
    /// Business card pointing at another identifier.
    NameCard
);

impl NameCard {
    pub fn new(id: &Id, name: &str, avatar: Option<&str>) -> Self {
        let mut base = BaseContent::new(ContentType::NAME_CARD);
        base.set("did", json!(id.to_string()));
        base.set("name", json!(name));
        base.set_str("avatar", avatar);
        Self(base)
    }

    pub fn id(&self) -> Option<Id> {
        self.0.get_str("did").and_then(|id| Id::parse(id).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get_str("name")
    }

    pub fn avatar(&self) -> Option<&str> {
        self.0.get_str("avatar")
    }
}

map_content!(
    /// Reply quoting an earlier message.
    QuoteContent
);

impl QuoteContent {
    /// Quotes a message, keeping a short summary of its envelope and content.
    pub fn new(text: &str, envelope: &Envelope, content: &Content) -> Self {
        let mut origin = Map::new();
        origin.insert("sender".into(), json!(envelope.sender().to_string()));
        origin.insert("receiver".into(), json!(envelope.receiver().to_string()));
        origin.insert("type".into(), json!(content.content_type().to_string()));
        origin.insert("sn".into(), json!(content.sn()));
        if let Some(group) = content.group() {
            origin.insert("group".into(), json!(group.to_string()));
        }

        let mut base = BaseContent::new(ContentType::QUOTE);
        base.set("text", json!(text));
        base.set("origin", Value::Object(origin));
        Self(base)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get_str("text")
    }

    pub fn origin(&self) -> Option<&Map> {
        self.0.get("origin").and_then(Value::as_object)
    }

    /// Serial number of the quoted content.
    pub fn origin_sn(&self) -> Option<u64> {
        self.origin()?.get("sn").and_then(Value::as_u64)
    }
}

map_content!(
    /// Money, transfer, claim-payment and split-bill payloads.
    MoneyContent
);

impl MoneyContent {
    pub fn new(content_type: ContentType, currency: &str, amount: f64) -> Self {
        let mut base = BaseContent::new(content_type);
        base.set("currency", json!(currency));
        base.set("amount", json!(amount));
        Self(base)
    }

    pub fn transfer(currency: &str, amount: f64, remitter: &Id, remittee: &Id) -> Self {
        let mut content = Self::new(ContentType::TRANSFER, currency, amount);
        content.0.set("remitter", json!(remitter.to_string()));
        content.0.set("remittee", json!(remittee.to_string()));
        content
    }

    pub fn currency(&self) -> Option<&str> {
        self.0.get_str("currency")
    }

    pub fn amount(&self) -> f64 {
        get_f64(self.0.as_map(), "amount").unwrap_or_default()
    }

    pub fn remitter(&self) -> Option<Id> {
        self.0.get_str("remitter").and_then(|id| Id::parse(id).ok())
    }

    pub fn remittee(&self) -> Option<Id> {
        self.0.get_str("remittee").and_then(|id| Id::parse(id).ok())
    }
}

map_content!(
    /// Application defined payload, routed by `app`, `mod` and `act`.
    CustomizedContent
);

impl CustomizedContent {
    pub fn new(app: &str, module: &str, action: &str) -> Self {
        let mut base = BaseContent::new(ContentType::CUSTOMIZED);
        base.set("app", json!(app));
        base.set("mod", json!(module));
        base.set("act", json!(action));
        Self(base)
    }

    pub fn application(&self) -> Option<&str> {
        self.0.get_str("app")
    }

    pub fn module(&self) -> Option<&str> {
        self.0.get_str("mod")
    }

    pub fn action(&self) -> Option<&str> {
        self.0.get_str("act")
    }
}

#[cfg(test)]
mod tests {
    use crate::content::{Content, ContentType};
    use crate::identity::Id;
    use crate::message::Envelope;

    use super::{MoneyContent, PageContent, QuoteContent, TextContent};

    #[test]
    fn text() {
        let content = TextContent::new("hi");
        assert_eq!(content.text(), Some("hi"));
        assert_eq!(content.content_type(), ContentType::TEXT);
    }

    #[test]
    fn page_without_optional_fields() {
        let content = PageContent::new("https://p2panda.org", "p2panda", None, None);
        assert_eq!(content.url(), Some("https://p2panda.org"));
        assert_eq!(content.desc(), None);
        assert!(!content.as_map().contains_key("icon"));
    }

    #[test]
    fn quote_keeps_origin() {
        let original: Content = TextContent::new("first").into();
        let envelope = Envelope::new(Id::founder(), Id::anyone(), Some(1700000000.0));

        let quote = QuoteContent::new("reply", &envelope, &original);
        assert_eq!(quote.text(), Some("reply"));
        assert_eq!(quote.origin_sn(), Some(original.sn()));
        assert_eq!(
            quote.origin().and_then(|origin| origin.get("sender")),
            Some(&serde_json::json!("moky@anywhere"))
        );
    }

    #[test]
    fn transfer() {
        let content = MoneyContent::transfer("EUR", 4.5, &Id::founder(), &Id::anyone());
        assert_eq!(content.content_type(), ContentType::TRANSFER);
        assert_eq!(content.amount(), 4.5);
        assert_eq!(content.remittee(), Some(Id::anyone()));
    }
}
