// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces the host implements to feed identities, keys and group memberships into the
//! directory.
//!
//! Lookups never fail: material that isn't available (yet) is returned as `None` or as an empty
//! list and the message pipeline treats it as "retry later".
use std::sync::Arc;

use dimp_core::crypto::PrivateKey;
use dimp_core::{Document, Id, Meta};

use crate::entity::{Group, User};

/// Metas and documents of any entity.
pub trait EntityDataSource: Send + Sync {
    fn meta(&self, id: &Id) -> Option<Meta>;

    /// Latest document of the given type, for example `visa` or `bulletin`.
    fn document(&self, id: &Id, doc_type: &str) -> Option<Document>;

    /// Stores a verified meta, returns `false` if the data source doesn't accept it.
    fn save_meta(&self, _meta: &Meta, _id: &Id) -> bool {
        false
    }

    /// Stores a verified document, returns `false` if the data source doesn't accept it.
    fn save_document(&self, _document: &Document) -> bool {
        false
    }
}

/// Contacts and private keys of users.
pub trait UserDataSource: EntityDataSource {
    fn contacts(&self, user: &Id) -> Vec<Id>;

    /// Private keys paired with the user's visa and meta keys, tried in order.
    fn private_keys_for_decryption(&self, user: &Id) -> Vec<Arc<dyn PrivateKey>>;

    /// Key signing outgoing messages of the user.
    fn private_key_for_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>>;

    /// Key paired with the meta key, signing the user's visa.
    fn private_key_for_visa_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>>;

    /// Identities this node holds private keys for.
    fn local_users(&self) -> Vec<Id>;
}

/// Administration and membership of groups.
pub trait GroupDataSource: EntityDataSource {
    fn founder(&self, group: &Id) -> Option<Id>;

    fn owner(&self, group: &Id) -> Option<Id>;

    /// Members of the group, an empty list while the membership is unknown.
    fn members(&self, group: &Id) -> Vec<Id>;

    fn assistants(&self, group: &Id) -> Vec<Id>;
}

/// Everything the directory needs from the host.
pub trait DataSource: UserDataSource + GroupDataSource {}

impl<T> DataSource for T where T: UserDataSource + GroupDataSource {}

/// Creates the entity objects the directory caches.
///
/// Hosts override this to attach their own rules, for example to refuse entities of networks they
/// don't serve. The default creates an entity when its meta is known or its ID is a broadcast ID.
pub trait EntityFactory: Send + Sync {
    fn create_user(&self, id: &Id, meta: Option<Meta>) -> Option<User> {
        match meta {
            Some(meta) => Some(User::new(id.clone(), Some(meta))),
            None if id.is_broadcast() => Some(User::new(id.clone(), None)),
            None => None,
        }
    }

    fn create_group(&self, id: &Id, meta: Option<Meta>) -> Option<Group> {
        match meta {
            Some(meta) => Some(Group::new(id.clone(), Some(meta))),
            None if id.is_broadcast() => Some(Group::new(id.clone(), None)),
            None => None,
        }
    }
}

/// Entity factory with the default creation rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultEntityFactory;

impl EntityFactory for DefaultEntityFactory {}
