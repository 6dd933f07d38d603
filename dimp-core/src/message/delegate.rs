// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces messages call back into while moving between their three states.
//!
//! A message never holds a reference to whoever transforms it. The delegate is handed in as an
//! explicit context argument to [`InstantMessage::encrypt`], [`SecureMessage::decrypt`],
//! [`SecureMessage::sign`] and [`ReliableMessage::verify`]. Every callback receives the envelope
//! of the message it is working on.
//!
//! [`InstantMessage::encrypt`]: crate::message::InstantMessage::encrypt
//! [`SecureMessage::decrypt`]: crate::message::SecureMessage::decrypt
//! [`SecureMessage::sign`]: crate::message::SecureMessage::sign
//! [`ReliableMessage::verify`]: crate::message::ReliableMessage::verify
use std::error::Error;
use std::sync::Arc;

use crate::content::Content;
use crate::crypto::SymmetricKey;
use crate::identity::Id;
use crate::message::{Envelope, MessageError};

/// Callbacks turning an instant message into a secure message.
pub trait InstantMessageDelegate {
    type Error: Error + From<MessageError>;

    /// Canonical bytes of the content.
    fn serialize_content(
        &self,
        content: &Content,
        password: &dyn SymmetricKey,
        envelope: &Envelope,
    ) -> Result<Vec<u8>, Self::Error>;

    fn encrypt_content(
        &self,
        data: &[u8],
        password: &dyn SymmetricKey,
        envelope: &Envelope,
    ) -> Result<Vec<u8>, Self::Error>;

    /// String form of the encrypted content for the `data` field.
    fn encode_data(&self, data: &[u8], envelope: &Envelope) -> Result<String, Self::Error>;

    /// Bytes of the symmetric key, `None` when no key travels with the message.
    fn serialize_key(
        &self,
        password: &dyn SymmetricKey,
        envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Wraps the key for one receiver, `None` when the receiver's encryption key is unknown.
    fn encrypt_key(
        &self,
        key: &[u8],
        receiver: &Id,
        envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error>;

    fn encode_key(&self, key: &[u8], envelope: &Envelope) -> String;
}

/// Callbacks turning a secure message into an instant or a reliable message.
pub trait SecureMessageDelegate {
    type Error: Error + From<MessageError>;

    fn decode_key(&self, key: &str, envelope: &Envelope) -> Option<Vec<u8>>;

    /// Unwraps the key with the private keys of the local receiver.
    fn decrypt_key(
        &self,
        key: &[u8],
        receiver: &Id,
        envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Restores the symmetric key, falling back to a cached one if no key material is attached.
    fn deserialize_key(
        &self,
        key: Option<&[u8]>,
        envelope: &Envelope,
    ) -> Result<Option<Arc<dyn SymmetricKey>>, Self::Error>;

    fn decode_data(&self, data: &str, envelope: &Envelope) -> Option<Vec<u8>>;

    fn decrypt_content(
        &self,
        data: &[u8],
        password: &dyn SymmetricKey,
        envelope: &Envelope,
    ) -> Option<Vec<u8>>;

    /// Parses the content and remembers the key for the conversation once that succeeded.
    fn deserialize_content(
        &self,
        data: &[u8],
        password: &Arc<dyn SymmetricKey>,
        envelope: &Envelope,
    ) -> Result<Option<Content>, Self::Error>;

    /// Signs the raw encrypted content with the sender's private key.
    fn sign_data(&self, data: &[u8], envelope: &Envelope) -> Result<Vec<u8>, Self::Error>;

    fn encode_signature(&self, signature: &[u8], envelope: &Envelope) -> String;
}

/// Callbacks verifying a reliable message.
pub trait ReliableMessageDelegate: SecureMessageDelegate {
    fn decode_signature(&self, signature: &str, envelope: &Envelope) -> Option<Vec<u8>>;

    /// Checks the signature with the verification keys of the sender.
    fn verify_data_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        envelope: &Envelope,
    ) -> Result<bool, Self::Error>;
}
