// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic identities for tests.
use std::sync::Arc;

use crate::crypto::{CryptoProvider, ED25519, PrivateKey, Provider, X25519};
use crate::document::{BULLETIN, Document, VISA};
use crate::identity::{EntityType, Id};
use crate::meta::{Meta, MetaType};

/// User with a signed meta (Ed25519) and a signed visa carrying an X25519 encryption key.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Id,
    pub meta: Meta,
    pub visa: Document,
    pub sign_key: Arc<dyn PrivateKey>,
    pub decrypt_key: Arc<dyn PrivateKey>,
}

impl Account {
    pub fn generate(provider: &Provider, name: &str) -> Self {
        let sign_key = provider.generate_private_key(ED25519).unwrap();
        let decrypt_key = provider.generate_private_key(X25519).unwrap();

        let meta = Meta::generate(MetaType::MKM, sign_key.as_ref(), Some(name)).unwrap();
        let id = meta.generate_id(EntityType::USER, None);

        let mut visa = Document::new(id.clone(), VISA);
        visa.set_name(name);
        visa.set_public_key(decrypt_key.public_key().as_ref());
        visa.sign(sign_key.as_ref()).unwrap();

        Self {
            id,
            meta,
            visa,
            sign_key,
            decrypt_key,
        }
    }
}

/// Group founded by `founder`, its meta is signed with the founder's key.
#[derive(Clone, Debug)]
pub struct GroupAccount {
    pub id: Id,
    pub meta: Meta,
    pub bulletin: Document,
}

impl GroupAccount {
    pub fn generate(name: &str, founder: &Account) -> Self {
        let meta = Meta::generate(MetaType::MKM, founder.sign_key.as_ref(), Some(name)).unwrap();
        let id = meta.generate_id(EntityType::GROUP, None);

        let mut bulletin = Document::new(id.clone(), BULLETIN);
        bulletin.set_name(name);
        bulletin.set_founder(&founder.id);
        bulletin.sign(founder.sign_key.as_ref()).unwrap();

        Self { id, meta, bulletin }
    }
}
