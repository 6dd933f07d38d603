// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages in their three states.
//!
//! An [`InstantMessage`] carries its content in clear. Encrypting it with a symmetric key yields a
//! [`SecureMessage`] holding the encoded ciphertext in `data` and the key wrapped either once for
//! the receiver (`key`) or once per group member (`keys`). Signing `data` yields a
//! [`ReliableMessage`], the form that goes onto the wire.
//!
//! ```text
//! InstantMessage ──encrypt──► SecureMessage ──sign──► ReliableMessage
//!        ▲                        │    ▲                    │
//!        └────────decrypt─────────┘    └──────verify────────┘
//! ```
//!
//! Each transition calls back into a delegate (see [`delegate`]) for all byte-level work, so the
//! message types only enforce the field layout of each state.
mod delegate;
mod envelope;
mod instant;
mod reliable;
mod secure;

pub use delegate::{InstantMessageDelegate, ReliableMessageDelegate, SecureMessageDelegate};
pub use envelope::Envelope;
pub use instant::InstantMessage;
pub use reliable::ReliableMessage;
pub use secure::SecureMessage;

use thiserror::Error;

/// Message maps that can't be read in the expected state.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message is missing field '{0}'")]
    MissingField(&'static str),

    #[error("message field '{0}' is not a valid identifier")]
    InvalidId(&'static str),

    #[error("message data could not be decoded")]
    InvalidData,

    #[error("secure message carries both 'key' and 'keys'")]
    ConflictingKeys,
}
