// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meta, the cryptographic birth certificate of an entity.
//!
//! A meta binds an identifier to a public key: the address of an [`Id`] is derived from the meta
//! key (or from the fingerprint over a seed), so anyone holding the meta can check that it belongs
//! to an identifier without asking a third party. An entity has exactly one meta for its lifetime.
use std::sync::{Arc, OnceLock};

use serde_json::{Value, json};
use thiserror::Error;

use crate::codec::{Map, base64_decode, base64_encode, get_map, get_str};
use crate::crypto::{CryptoError, CryptoProvider, PrivateKey, PublicKey};
use crate::identity::{Address, EntityType, Id};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MetaType(u8);

impl MetaType {
    /// Default meta with a seed (used as the identifier's name) and a fingerprint over it.
    pub const MKM: Self = Self(0x01);

    /// Key-only meta, address derived from the public key.
    pub const BTC: Self = Self(0x02);

    /// Key-only meta, address derived from the public key.
    pub const ETH: Self = Self(0x04);

    pub const fn from_byte(value: u8) -> Self {
        Self(value)
    }

    pub const fn as_byte(&self) -> u8 {
        self.0
    }

    pub const fn has_seed(&self) -> bool {
        self.0 & Self::MKM.0 == Self::MKM.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        let number = match value {
            Value::Number(number) => number.as_u64()?,
            Value::String(value) => value.parse().ok()?,
            _ => return None,
        };
        u8::try_from(number).ok().map(Self)
    }
}

#[derive(Clone, Debug)]
pub struct Meta {
    map: Map,
    meta_type: MetaType,
    public_key: Arc<dyn PublicKey>,
    seed: Option<String>,
    fingerprint: Option<Vec<u8>>,
    valid: OnceLock<bool>,
}

impl Meta {
    pub fn from_map(map: Map, provider: &dyn CryptoProvider) -> Result<Self, MetaError> {
        let meta_type = map
            .get("type")
            .and_then(MetaType::from_value)
            .ok_or(MetaError::InvalidType)?;
        let key = get_map(&map, "key").ok_or(MetaError::MissingField("key"))?;
        let public_key = provider.parse_public_key(key)?;

        let seed = get_str(&map, "seed").map(str::to_string);
        let fingerprint = get_str(&map, "fingerprint").and_then(base64_decode);

        Ok(Self {
            map,
            meta_type,
            public_key,
            seed,
            fingerprint,
            valid: OnceLock::new(),
        })
    }

    /// Creates a meta for a new entity, signing the seed when the meta type needs one.
    pub fn generate(
        meta_type: MetaType,
        private_key: &dyn PrivateKey,
        seed: Option<&str>,
    ) -> Result<Self, MetaError> {
        let public_key = private_key.public_key();

        let mut map = Map::new();
        map.insert("type".into(), json!(meta_type.as_byte()));
        map.insert("key".into(), Value::Object(public_key.to_map()));

        let (seed, fingerprint) = if meta_type.has_seed() {
            let seed = seed.ok_or(MetaError::MissingField("seed"))?;
            let fingerprint = private_key.sign(seed.as_bytes())?;
            map.insert("seed".into(), json!(seed));
            map.insert("fingerprint".into(), json!(base64_encode(&fingerprint)));
            (Some(seed.to_string()), Some(fingerprint))
        } else {
            (None, None)
        };

        Ok(Self {
            map,
            meta_type,
            public_key,
            seed,
            fingerprint,
            valid: OnceLock::new(),
        })
    }

    pub fn meta_type(&self) -> MetaType {
        self.meta_type
    }

    pub fn public_key(&self) -> &Arc<dyn PublicKey> {
        &self.public_key
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&[u8]> {
        self.fingerprint.as_deref()
    }

    /// Returns true if the fingerprint is a valid signature over the seed.
    ///
    /// Metas without seed are valid as long as their key could be parsed. The result is computed
    /// once and memoized.
    pub fn is_valid(&self) -> bool {
        *self.valid.get_or_init(|| {
            if !self.meta_type.has_seed() {
                return true;
            }
            match (&self.seed, &self.fingerprint) {
                (Some(seed), Some(fingerprint)) if !seed.is_empty() => {
                    self.public_key.verify(seed.as_bytes(), fingerprint)
                }
                _ => false,
            }
        })
    }

    /// Derives the address this meta stands for in the given network.
    pub fn generate_address(&self, network: EntityType) -> Address {
        match (&self.fingerprint, self.meta_type.has_seed()) {
            (Some(fingerprint), true) => Address::generate(fingerprint, network),
            _ => Address::generate(self.public_key.as_bytes(), network),
        }
    }

    /// Derives the identifier this meta stands for, the seed becomes the name.
    pub fn generate_id(&self, network: EntityType, terminal: Option<&str>) -> Id {
        Id::new(
            self.seed.as_deref(),
            self.generate_address(network),
            terminal,
        )
    }

    /// Returns true if this is a valid meta for the given identifier.
    pub fn matches_id(&self, id: &Id) -> bool {
        if !self.is_valid() {
            return false;
        }
        if self.meta_type.has_seed() && id.name() != self.seed.as_deref() {
            return false;
        }
        self.generate_address(id.entity_type()) == *id.address()
    }

    /// Returns true if the given key is the meta key itself.
    pub fn matches_public_key(&self, public_key: &dyn PublicKey) -> bool {
        self.public_key.algorithm() == public_key.algorithm()
            && self.public_key.as_bytes() == public_key.as_bytes()
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    pub fn to_map(&self) -> Map {
        self.map.clone()
    }
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("meta is missing field '{0}'")]
    MissingField(&'static str),

    #[error("meta has an invalid type")]
    InvalidType,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
