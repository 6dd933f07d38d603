// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dimp-core` holds the data model of the DIMP messaging protocol: self-sovereign identities
//! addressed by cryptographic IDs, their metas and signed documents, polymorphic message contents
//! and the three states a message passes through between sender and receiver.
//!
//! ## Identities
//!
//! An [`Id`] names a user, group or service as `name@address/terminal`. The address is derived
//! from the entity's [`Meta`], a self-signed "birth certificate" binding the ID to a public key.
//! Further keys and properties are published through signed [`Document`]s: a visa for users, a
//! bulletin for groups.
//!
//! ## Contents
//!
//! Contents are string-keyed maps identified by a numeric `type`. The [`Content`] enum offers a
//! typed view on the standard variants while keeping the map authoritative, so fields a node
//! doesn't know about survive a round trip. A [`ContentRegistry`] turns received maps back into
//! typed contents and can be extended by the application.
//!
//! ## Messages
//!
//! An [`InstantMessage`] is encrypted into a [`SecureMessage`] and signed into a
//! [`ReliableMessage`]. All key handling happens in delegates passed into each transition, see
//! [`message`] for details. `dimp-transceiver` implements these delegates on top of an entity
//! directory and a symmetric-key cache.
//!
//! ## Cryptography
//!
//! Keys are used through the traits in [`crypto`]. The default [`Provider`] signs with Ed25519,
//! encrypts towards users with HPKE over X25519 and encrypts contents with AES-256-GCM.
//!
//! [`Id`]: identity::Id
//! [`Meta`]: meta::Meta
//! [`Document`]: document::Document
//! [`Content`]: content::Content
//! [`ContentRegistry`]: content::ContentRegistry
//! [`InstantMessage`]: message::InstantMessage
//! [`SecureMessage`]: message::SecureMessage
//! [`ReliableMessage`]: message::ReliableMessage
//! [`Provider`]: crypto::Provider
pub mod codec;
pub mod content;
pub mod crypto;
pub mod document;
pub mod identity;
pub mod message;
pub mod meta;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod timestamp;
pub mod transportable;

pub use codec::Map;
pub use content::{Command, Content, ContentRegistry, ContentType};
pub use document::Document;
pub use identity::{Address, EntityType, Id, IdentityError};
pub use message::{Envelope, InstantMessage, MessageError, ReliableMessage, SecureMessage};
pub use meta::{Meta, MetaType};
pub use transportable::TransportableData;
