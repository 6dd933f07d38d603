// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dimp-transceiver` turns the message types of `dimp-core` into a working pipeline: outgoing
//! instant messages become signed bytes, received bytes become instant messages and, through
//! application handlers, replies.
//!
//! ## Sending
//!
//! ```text
//! InstantMessage ─encrypt─► SecureMessage ─sign─► ReliableMessage ─serialize─► bytes
//! ```
//!
//! Contents are encrypted with a symmetric key shared per direction `(sender, receiver)` and kept
//! in a [`KeyCache`]. The key itself is wrapped with the receiver's public encryption key, or once
//! per member for group messages. Broadcast messages travel in clear and carry no key at all.
//!
//! ## Receiving
//!
//! ```text
//! bytes ─deserialize─► ReliableMessage ─verify─► SecureMessage ─decrypt─► InstantMessage
//! ```
//!
//! The [`Processor`] runs this chain and hands the content to a handler registered in a
//! [`ProcessorRegistry`]. A returned content is sent back to the original sender through the
//! sending chain.
//!
//! ## Missing data
//!
//! Metas, visas, group memberships and private keys are looked up through a [`DataSource`]
//! provided by the application, [`MemoryDataSource`] keeps everything in memory. Whenever a
//! step lacks data (an unknown encryption key, an unverifiable signature, an unknown group) it
//! returns `None` and the caller is expected to fetch the data and retry later. Errors are
//! reserved for a node without local users and for a user without a signing key.
//!
//! ```ignore
//! let transceiver = Transceiver::builder(data_source).build();
//! if let Some(secure) = transceiver.encrypt_message(&instant)? {
//!     let reliable = transceiver.sign_message(&secure)?;
//!     let bytes = transceiver.serialize_message(&reliable)?;
//! }
//! ```
mod barrack;
mod config;
mod entity;
mod key_cache;
mod memory;
mod packer;
mod processor;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
mod traits;
mod transceiver;
mod transformer;

pub use barrack::{Barrack, BarrackError};
pub use config::{Config, WireFormat};
pub use entity::{Group, User};
pub use key_cache::KeyCache;
pub use memory::{InnerMemoryDataSource, MemoryDataSource};
pub use packer::{Packer, PackerError, key_digest, overt_group};
pub use processor::{ContentProcessor, Processor, ProcessorRegistry};
pub use traits::{
    DataSource, DefaultEntityFactory, EntityDataSource, EntityFactory, GroupDataSource,
    UserDataSource,
};
pub use transceiver::{Transceiver, TransceiverBuilder, TransceiverError};
pub use transformer::{Transformer, TransformerError};
