// SPDX-License-Identifier: MIT OR Apache-2.0

use dimp_core::crypto::AES;

/// Field names used when serializing reliable messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Full field names, `sender`, `receiver`, `data`, ...
    #[default]
    Long,

    /// Single-letter aliases, see [`Packer::serialize_message`].
    ///
    /// [`Packer::serialize_message`]: crate::Packer::serialize_message
    Compact,
}

/// Configuration for a transceiver.
#[derive(Clone, Debug)]
pub struct Config {
    /// Field names of outgoing messages. Incoming messages are accepted in both formats.
    pub wire_format: WireFormat,

    /// Attach a short digest of the symmetric key to group messages.
    pub attach_key_digest: bool,

    /// Attach the sender's meta and visa to outgoing messages, so a receiver meeting us for the
    /// first time can verify and answer right away.
    pub attach_meta: bool,

    /// Algorithm of the symmetric keys generated for new conversations.
    pub symmetric_algorithm: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::Long,
            attach_key_digest: true,
            attach_meta: false,
            symmetric_algorithm: AES.to_string(),
        }
    }
}
