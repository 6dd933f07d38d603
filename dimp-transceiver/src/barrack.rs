// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory of users and groups with the key selection policy of the message pipeline.
use std::collections::BTreeMap;
use std::sync::Arc;

use dimp_core::crypto::{CryptoProvider, PrivateKey, PublicKey};
use dimp_core::document::{BULLETIN, VISA};
use dimp_core::{Address, Document, Id, Meta};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use crate::entity::{Group, User};
use crate::traits::{DataSource, DefaultEntityFactory, EntityFactory};

/// Caches users and groups and resolves their keys through the data source.
///
/// Metas are only trusted when they match the identifier they are stored for, visas only when
/// they verify against the meta key. Broadcast groups need no data at all, their founder, owner
/// and members follow from their identifier.
pub struct Barrack<S> {
    data_source: S,
    provider: Arc<dyn CryptoProvider>,
    factory: Box<dyn EntityFactory>,
    users: RwLock<BTreeMap<Id, Arc<User>>>,
    groups: RwLock<BTreeMap<Id, Arc<Group>>>,
}

impl<S> Barrack<S>
where
    S: DataSource,
{
    pub fn new(data_source: S, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            data_source,
            provider,
            factory: Box::new(DefaultEntityFactory),
            users: RwLock::new(BTreeMap::new()),
            groups: RwLock::new(BTreeMap::new()),
        }
    }

    /// Replaces the factory creating users and groups on a cache miss.
    pub fn with_factory(mut self, factory: Box<dyn EntityFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn data_source(&self) -> &S {
        &self.data_source
    }

    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    // Entities

    /// Returns the cached user or creates it once its meta is known.
    pub fn get_user(&self, id: &Id) -> Option<Arc<User>> {
        if let Some(user) = self.users.read().get(id) {
            return Some(user.clone());
        }
        let user = Arc::new(self.factory.create_user(id, self.meta(id))?);
        self.cache_user(user.clone());
        Some(user)
    }

    /// Returns the cached group or creates it once its meta is known.
    pub fn get_group(&self, id: &Id) -> Option<Arc<Group>> {
        if let Some(group) = self.groups.read().get(id) {
            return Some(group.clone());
        }
        let group = Arc::new(self.factory.create_group(id, self.meta(id))?);
        self.cache_group(group.clone());
        Some(group)
    }

    pub fn cache_user(&self, user: Arc<User>) {
        self.users.write().insert(user.id().clone(), user);
    }

    pub fn cache_group(&self, group: Arc<Group>) {
        self.groups.write().insert(group.id().clone(), group);
    }

    /// Number of cached users and groups.
    pub fn cache_size(&self) -> usize {
        self.users.read().len() + self.groups.read().len()
    }

    /// Evicts every second cached entity and returns the number of survivors.
    ///
    /// Users are scanned before groups, both in identifier order, and the first entity scanned
    /// survives. The outcome only depends on the cached identifiers.
    pub fn reduce_memory(&self) -> usize {
        let mut finger = 0;
        let users = thanos(&mut *self.users.write(), &mut finger);
        let groups = thanos(&mut *self.groups.write(), &mut finger);
        trace!(users, groups, "reduced entity cache");
        users + groups
    }

    // Local users

    /// Identities with private keys on this node.
    pub fn local_users(&self) -> Result<Vec<Id>, BarrackError> {
        let users = self.data_source.local_users();
        if users.is_empty() {
            return Err(BarrackError::NoLocalUser);
        }
        Ok(users)
    }

    /// Picks the local user a message for `receiver` is meant for.
    ///
    /// Broadcast messages go to the first local user. For a group the first local user found in
    /// its members is picked, `None` is returned while the membership is unknown.
    pub fn select_local_user(&self, receiver: &Id) -> Result<Option<Id>, BarrackError> {
        let users = self.local_users()?;

        if receiver.is_broadcast() {
            return Ok(users.into_iter().next());
        }

        if receiver.is_group() {
            let members = self.members(receiver);
            if members.is_empty() {
                debug!(group = %receiver, "group members not found");
                return Ok(None);
            }
            let user = users.into_iter().find(|user| members.contains(user));
            if user.is_none() {
                debug!(group = %receiver, "no local user is member of group");
            }
            return Ok(user);
        }

        Ok(users.into_iter().find(|user| user == receiver))
    }

    // Metas and documents

    /// Meta of an entity, only if it matches the identifier.
    pub fn meta(&self, id: &Id) -> Option<Meta> {
        let meta = self.data_source.meta(id)?;
        if !meta.matches_id(id) {
            debug!(%id, "meta does not match identifier");
            return None;
        }
        Some(meta)
    }

    /// Document of an entity, only if its signature verifies against the meta key.
    pub fn document(&self, id: &Id, doc_type: &str) -> Option<Document> {
        let document = self.data_source.document(id, doc_type)?;
        let meta = self.meta(document.id())?;
        if !document.verify(meta.public_key().as_ref()) {
            debug!(%id, doc_type, "document signature does not verify");
            return None;
        }
        Some(document)
    }

    pub fn visa(&self, user: &Id) -> Option<Document> {
        self.document(user, VISA)
    }

    pub fn bulletin(&self, group: &Id) -> Option<Document> {
        self.document(group, BULLETIN)
    }

    /// Stores a received meta if it matches the identifier.
    pub fn save_meta(&self, meta: &Meta, id: &Id) -> bool {
        if !meta.matches_id(id) {
            debug!(%id, "refusing meta not matching identifier");
            return false;
        }
        self.data_source.save_meta(meta, id)
    }

    /// Stores a received document if it verifies against the known meta.
    pub fn save_document(&self, document: &Document) -> bool {
        let Some(meta) = self.meta(document.id()) else {
            debug!(id = %document.id(), "meta not found for document");
            return false;
        };
        if !document.verify(meta.public_key().as_ref()) {
            debug!(id = %document.id(), "refusing document with invalid signature");
            return false;
        }
        self.data_source.save_document(document)
    }

    // Keys

    /// Key to encrypt messages for the user: the visa key, or the meta key if the visa has none
    /// usable for encryption.
    pub fn public_key_for_encryption(&self, user: &Id) -> Option<Arc<dyn PublicKey>> {
        let visa_key = self
            .visa(user)
            .and_then(|visa| visa.public_key(self.provider.as_ref()));
        if let Some(key) = visa_key.filter(|key| key.can_encrypt()) {
            return Some(key);
        }
        self.meta(user)
            .map(|meta| meta.public_key().clone())
            .filter(|key| key.can_encrypt())
    }

    /// Keys accepted for the user's signatures: the visa key first, then the meta key.
    pub fn public_keys_for_verification(&self, user: &Id) -> Vec<Arc<dyn PublicKey>> {
        let mut keys = Vec::new();
        let visa_key = self
            .visa(user)
            .and_then(|visa| visa.public_key(self.provider.as_ref()));
        if let Some(key) = visa_key.filter(|key| key.can_verify()) {
            keys.push(key);
        }
        if let Some(key) = self
            .meta(user)
            .map(|meta| meta.public_key().clone())
            .filter(|key| key.can_verify())
        {
            keys.push(key);
        }
        keys
    }

    pub fn private_keys_for_decryption(&self, user: &Id) -> Vec<Arc<dyn PrivateKey>> {
        self.data_source
            .private_keys_for_decryption(user)
            .into_iter()
            .filter(|key| key.can_decrypt())
            .collect()
    }

    pub fn private_key_for_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>> {
        self.data_source
            .private_key_for_signature(user)
            .filter(|key| key.can_sign())
    }

    pub fn private_key_for_visa_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>> {
        self.data_source
            .private_key_for_visa_signature(user)
            .filter(|key| key.can_sign())
    }

    pub fn contacts(&self, user: &Id) -> Vec<Id> {
        self.data_source.contacts(user)
    }

    // Groups

    /// Founder of the group, from the data source or the group's bulletin.
    pub fn founder(&self, group: &Id) -> Option<Id> {
        if group.is_broadcast() {
            return Some(broadcast_founder(group));
        }
        self.data_source
            .founder(group)
            .or_else(|| self.bulletin(group).and_then(|bulletin| bulletin.founder()))
    }

    /// Owner of the group, the founder unless the data source knows otherwise.
    pub fn owner(&self, group: &Id) -> Option<Id> {
        if group.is_broadcast() {
            return Some(broadcast_owner(group));
        }
        self.data_source
            .owner(group)
            .or_else(|| self.founder(group))
    }

    /// Members of the group, empty while the membership is unknown.
    pub fn members(&self, group: &Id) -> Vec<Id> {
        if group.is_broadcast() {
            return broadcast_members(group);
        }
        self.data_source.members(group)
    }

    pub fn assistants(&self, group: &Id) -> Vec<Id> {
        if group.is_broadcast() {
            return Vec::new();
        }
        let assistants = self.data_source.assistants(group);
        if !assistants.is_empty() {
            return assistants;
        }
        self.bulletin(group)
            .map(|bulletin| bulletin.assistants())
            .unwrap_or_default()
    }
}

/// Keeps the entities at even positions of the shared finger.
fn thanos<T>(cache: &mut BTreeMap<Id, T>, finger: &mut usize) -> usize {
    cache.retain(|_, _| {
        let keep = *finger % 2 == 0;
        *finger += 1;
        keep
    });
    cache.len()
}

/// Name of a broadcast group, `None` for `everyone@everywhere`.
fn broadcast_name(group: &Id) -> Option<&str> {
    group.name().filter(|name| !name.is_empty() && *name != "everyone")
}

fn anywhere_id(name: &str) -> Id {
    Id::new(Some(name), Address::anywhere(), None)
}

fn broadcast_founder(group: &Id) -> Id {
    match broadcast_name(group) {
        Some(name) => anywhere_id(&format!("{name}.founder")),
        None => Id::founder(),
    }
}

fn broadcast_owner(group: &Id) -> Id {
    match broadcast_name(group) {
        Some(name) => anywhere_id(&format!("{name}.owner")),
        None => Id::anyone(),
    }
}

fn broadcast_members(group: &Id) -> Vec<Id> {
    let owner = broadcast_owner(group);
    let member = match broadcast_name(group) {
        Some(name) => anywhere_id(&format!("{name}.member")),
        None => Id::anyone(),
    };
    if member == owner {
        vec![owner]
    } else {
        vec![owner, member]
    }
}

#[derive(Debug, Error)]
pub enum BarrackError {
    #[error("no local user available")]
    NoLocalUser,
}
