// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reception pipeline from received bytes to an optional reply.
use std::collections::HashMap;

use dimp_core::message::Envelope;
use dimp_core::{Content, ContentType, InstantMessage, ReliableMessage, SecureMessage};
use tracing::{debug, trace};

use crate::packer::{Packer, PackerError};
use crate::traits::DataSource;

/// Handles a received content, returning the content of a reply if there is one.
///
/// The second argument is the message as it arrived, so handlers can inspect the sender and the
/// attached envelope fields.
pub type ContentProcessor =
    Box<dyn Fn(&Content, &ReliableMessage) -> Option<Content> + Send + Sync>;

/// Application handlers keyed by content type and by command name.
///
/// Commands are looked up by their name first and by their content type second. Nothing is
/// registered by default.
#[derive(Default)]
pub struct ProcessorRegistry {
    contents: HashMap<ContentType, ContentProcessor>,
    commands: HashMap<String, ContentProcessor>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_content_processor(
        &mut self,
        content_type: ContentType,
        processor: ContentProcessor,
    ) {
        self.contents.insert(content_type, processor);
    }

    pub fn register_command_processor(&mut self, name: &str, processor: ContentProcessor) {
        self.commands.insert(name.to_string(), processor);
    }

    /// Handler responsible for `content`.
    pub fn processor(&self, content: &Content) -> Option<&ContentProcessor> {
        if let Some(command) = content.as_command() {
            if let Some(processor) = self.commands.get(command.name()) {
                return Some(processor);
            }
        }
        self.contents.get(&content.content_type())
    }
}

/// Runs received messages through the packer and the registered content handlers.
///
/// Every step hands over to the next one only when it produced a value, otherwise the whole call
/// ends without a reply.
pub struct Processor<'a, S> {
    packer: Packer<'a, S>,
    processors: &'a ProcessorRegistry,
}

impl<'a, S> Processor<'a, S>
where
    S: DataSource,
{
    pub fn new(packer: Packer<'a, S>, processors: &'a ProcessorRegistry) -> Self {
        Self { packer, processors }
    }

    pub fn packer(&self) -> &Packer<'a, S> {
        &self.packer
    }

    /// Processes a received packet and returns the serialized reply.
    pub fn process_data(&self, data: &[u8]) -> Result<Option<Vec<u8>>, PackerError> {
        let Some(reliable) = self.packer.deserialize_message(data) else {
            return Ok(None);
        };
        let Some(reply) = self.process_reliable(&reliable)? else {
            return Ok(None);
        };
        self.packer.serialize_message(&reply).map(Some)
    }

    /// Verifies a received message and returns the signed reply.
    ///
    /// `None` after a failed verification means the caller should keep the message and query the
    /// sender's meta and visa.
    pub fn process_reliable(
        &self,
        reliable: &ReliableMessage,
    ) -> Result<Option<ReliableMessage>, PackerError> {
        let Some(secure) = self.packer.verify_message(reliable)? else {
            debug!(sender = %reliable.sender(), "message not verified");
            return Ok(None);
        };
        let Some(reply) = self.process_secure(&secure, reliable)? else {
            return Ok(None);
        };
        self.packer.sign_message(&reply).map(Some)
    }

    /// Decrypts a verified message and returns the encrypted reply.
    pub fn process_secure(
        &self,
        secure: &SecureMessage,
        reliable: &ReliableMessage,
    ) -> Result<Option<SecureMessage>, PackerError> {
        let Some(instant) = self.packer.decrypt_message(secure)? else {
            debug!(
                sender = %secure.sender(),
                receiver = %secure.receiver(),
                "message not decrypted"
            );
            return Ok(None);
        };
        let Some(reply) = self.process_instant(&instant, reliable)? else {
            return Ok(None);
        };
        self.packer.encrypt_message(&reply)
    }

    /// Hands the content to its handler and addresses the reply back to the original sender.
    ///
    /// The reply is sent by the local user the message was delivered to.
    pub fn process_instant(
        &self,
        instant: &InstantMessage,
        reliable: &ReliableMessage,
    ) -> Result<Option<InstantMessage>, PackerError> {
        let Some(reply) = self.process_content(instant.content(), reliable) else {
            return Ok(None);
        };

        let barrack = self.packer.transformer().barrack();
        let Some(user) = barrack.select_local_user(instant.receiver())? else {
            debug!(receiver = %instant.receiver(), "receiver is not a local user");
            return Ok(None);
        };
        let envelope = Envelope::new(user, reliable.sender().clone(), None);
        Ok(Some(InstantMessage::new(envelope, reply)))
    }

    /// Dispatches a content to the registered handler, `None` if there is none.
    pub fn process_content(
        &self,
        content: &Content,
        reliable: &ReliableMessage,
    ) -> Option<Content> {
        let Some(processor) = self.processors.processor(content) else {
            debug!(
                sender = %reliable.sender(),
                content_type = content.content_type().value(),
                "no processor for content"
            );
            return None;
        };
        trace!(sender = %reliable.sender(), sn = content.sn(), "process content");
        processor(content, reliable)
    }
}
