// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity types, addresses and identifiers.
//!
//! Every participant is addressed by an [`Id`] of the form `name@address/terminal`. The address is
//! derived from the entity's meta key and carries the entity type, so whether an identifier
//! belongs to a user, a group or a broadcast audience can be answered without any lookup.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crypto::digest::{blake3, sha256, sha256d};

const ANYWHERE: &str = "anywhere";

const EVERYWHERE: &str = "everywhere";

/// Number of bytes taken from the key digest.
const DIGEST_SIZE: usize = 20;

/// Number of bytes of the address checksum.
const CHECKSUM_SIZE: usize = 4;

const ADDRESS_SIZE: usize = 1 + DIGEST_SIZE + CHECKSUM_SIZE;

/// Network byte of an address.
///
/// The lowest bit marks groups, the highest bit marks broadcast audiences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(u8);

impl EntityType {
    pub const USER: Self = Self(0x00);
    pub const GROUP: Self = Self(0x01);
    pub const STATION: Self = Self(0x02);
    pub const ISP: Self = Self(0x03);
    pub const BOT: Self = Self(0x04);
    pub const ICP: Self = Self(0x05);
    pub const SUPERVISOR: Self = Self(0x06);
    pub const COMPANY: Self = Self(0x07);
    pub const ANY: Self = Self(0x80);
    pub const EVERY: Self = Self(0x81);

    pub const fn from_byte(value: u8) -> Self {
        Self(value)
    }

    pub const fn as_byte(&self) -> u8 {
        self.0
    }

    pub const fn is_user(&self) -> bool {
        self.0 & Self::GROUP.0 == 0
    }

    pub const fn is_group(&self) -> bool {
        self.0 & Self::GROUP.0 == Self::GROUP.0
    }

    pub const fn is_broadcast(&self) -> bool {
        self.0 & Self::ANY.0 == Self::ANY.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    network: EntityType,
    value: String,
}

impl Address {
    /// Broadcast address of all users.
    pub fn anywhere() -> Self {
        Self {
            network: EntityType::ANY,
            value: ANYWHERE.to_string(),
        }
    }

    /// Broadcast address of all groups.
    pub fn everywhere() -> Self {
        Self {
            network: EntityType::EVERY,
            value: EVERYWHERE.to_string(),
        }
    }

    /// Derives an address from the fingerprint of a meta key.
    ///
    /// Layout: `network (1) || blake3(sha256(fingerprint))[..20] || checksum (4)`, hex encoded.
    pub fn generate(fingerprint: &[u8], network: EntityType) -> Self {
        let digest = blake3(&[&sha256(&[fingerprint])]);

        let mut bytes = Vec::with_capacity(ADDRESS_SIZE);
        bytes.push(network.as_byte());
        bytes.extend_from_slice(&digest[..DIGEST_SIZE]);
        let checksum = sha256d(&[&bytes]);
        bytes.extend_from_slice(&checksum[..CHECKSUM_SIZE]);

        Self {
            network,
            value: hex::encode(bytes),
        }
    }

    pub fn parse(value: &str) -> Result<Self, IdentityError> {
        if value.eq_ignore_ascii_case(ANYWHERE) {
            return Ok(Self::anywhere());
        }
        if value.eq_ignore_ascii_case(EVERYWHERE) {
            return Ok(Self::everywhere());
        }

        let bytes =
            hex::decode(value).map_err(|_| IdentityError::InvalidAddress(value.to_string()))?;
        if bytes.len() != ADDRESS_SIZE {
            return Err(IdentityError::InvalidAddress(value.to_string()));
        }

        let (body, checksum) = bytes.split_at(1 + DIGEST_SIZE);
        if sha256d(&[body])[..CHECKSUM_SIZE] != *checksum {
            return Err(IdentityError::InvalidChecksum(value.to_string()));
        }

        Ok(Self {
            network: EntityType::from_byte(bytes[0]),
            value: value.to_ascii_lowercase(),
        })
    }

    pub fn network(&self) -> EntityType {
        self.network
    }

    pub fn is_user(&self) -> bool {
        self.network.is_user()
    }

    pub fn is_group(&self) -> bool {
        self.network.is_group()
    }

    pub fn is_broadcast(&self) -> bool {
        self.network.is_broadcast()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Identifier of a user or group: `name@address/terminal`.
///
/// Two identifiers are equal when their canonical string forms are equal.
#[derive(Clone)]
pub struct Id {
    name: Option<String>,
    address: Address,
    terminal: Option<String>,
    canonical: String,
}

impl Id {
    pub fn new(name: Option<&str>, address: Address, terminal: Option<&str>) -> Self {
        let name = name.filter(|name| !name.is_empty()).map(str::to_string);
        let terminal = terminal
            .filter(|terminal| !terminal.is_empty())
            .map(str::to_string);

        let mut canonical = String::new();
        if let Some(name) = &name {
            canonical.push_str(name);
            canonical.push('@');
        }
        canonical.push_str(address.as_str());
        if let Some(terminal) = &terminal {
            canonical.push('/');
            canonical.push_str(terminal);
        }

        Self {
            name,
            address,
            terminal,
            canonical,
        }
    }

    pub fn parse(value: &str) -> Result<Self, IdentityError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(IdentityError::InvalidId(value.to_string()));
        }

        let (rest, terminal) = match value.split_once('/') {
            Some((rest, terminal)) => (rest, Some(terminal)),
            None => (value, None),
        };
        let (name, address) = match rest.split_once('@') {
            Some((name, address)) => (Some(name), address),
            None => (None, rest),
        };

        let address = Address::parse(address)?;
        Ok(Self::new(name, address, terminal))
    }

    /// Broadcast receiver for "any user", `anyone@anywhere`.
    pub fn anyone() -> Self {
        Self::new(Some("anyone"), Address::anywhere(), None)
    }

    /// Broadcast group of "every user", `everyone@everywhere`.
    pub fn everyone() -> Self {
        Self::new(Some("everyone"), Address::everywhere(), None)
    }

    /// Founder of the `everyone@everywhere` group, `moky@anywhere`.
    pub fn founder() -> Self {
        Self::new(Some("moky"), Address::anywhere(), None)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    pub fn entity_type(&self) -> EntityType {
        self.address.network()
    }

    pub fn is_user(&self) -> bool {
        self.address.is_user()
    }

    pub fn is_group(&self) -> bool {
        self.address.is_group()
    }

    pub fn is_broadcast(&self) -> bool {
        self.address.is_broadcast()
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.canonical).finish()
    }
}

impl FromStr for Id {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Id {
    type Error = IdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.canonical)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid checksum in address '{0}'")]
    InvalidChecksum(String),

    #[error("invalid identifier '{0}'")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{Address, EntityType, Id, IdentityError};

    #[test]
    fn entity_type_flags() {
        assert!(EntityType::USER.is_user());
        assert!(EntityType::STATION.is_user());
        assert!(EntityType::GROUP.is_group());
        assert!(EntityType::ICP.is_group());
        assert!(EntityType::ANY.is_broadcast() && EntityType::ANY.is_user());
        assert!(EntityType::EVERY.is_broadcast() && EntityType::EVERY.is_group());
        assert!(!EntityType::BOT.is_broadcast());
    }

    #[test]
    fn generated_address() {
        let address = Address::generate(b"fingerprint", EntityType::GROUP);
        assert_eq!(address.as_str().len(), 50);
        assert!(address.is_group());

        let parsed = Address::parse(address.as_str()).unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.network(), EntityType::GROUP);

        // Changing one character breaks the checksum.
        let mut tampered = address.as_str().to_string();
        let last = if tampered.ends_with('0') { "1" } else { "0" };
        tampered.replace_range(49..50, last);
        assert_matches!(
            Address::parse(&tampered),
            Err(IdentityError::InvalidChecksum(_))
        );
        assert_matches!(Address::parse("aaa"), Err(IdentityError::InvalidAddress(_)));
    }

    #[test]
    fn parse_identifiers() {
        let address = Address::generate(b"alice", EntityType::USER);

        let id = Id::parse(&format!("alice@{address}/phone")).unwrap();
        assert_eq!(id.name(), Some("alice"));
        assert_eq!(id.address(), &address);
        assert_eq!(id.terminal(), Some("phone"));
        assert_eq!(id.to_string(), format!("alice@{address}/phone"));

        let id = Id::parse(address.as_str()).unwrap();
        assert_eq!(id.name(), None);
        assert_eq!(id.as_str(), address.as_str());

        assert!(Id::parse("").is_err());
    }

    #[test]
    fn canonical_equality() {
        let address = Address::generate(b"bob", EntityType::USER);
        let id_1 = Id::new(Some("bob"), address.clone(), None);
        let id_2 = Id::parse(&format!("bob@{address}")).unwrap();
        let id_3 = Id::parse(&format!("bob@{address}/laptop")).unwrap();
        assert_eq!(id_1, id_2);
        assert_ne!(id_1, id_3);
    }

    #[test]
    fn broadcast_identifiers() {
        assert_eq!(Id::anyone().to_string(), "anyone@anywhere");
        assert_eq!(Id::everyone().to_string(), "everyone@everywhere");
        assert_eq!(Id::founder().to_string(), "moky@anywhere");

        assert!(Id::anyone().is_broadcast() && Id::anyone().is_user());
        assert!(Id::everyone().is_broadcast() && Id::everyone().is_group());
        assert_eq!(Id::parse("anyone@anywhere").unwrap(), Id::anyone());
        assert!(Id::parse("chatroom@everywhere").unwrap().is_group());
    }

    #[test]
    fn serde_string_form() {
        let id = Id::everyone();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""everyone@everywhere""#);
        let id_again: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(id, id_again);
    }
}
