// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory data source for identities, keys and group memberships.
use std::collections::HashMap;
use std::sync::Arc;

use dimp_core::crypto::PrivateKey;
use dimp_core::{Document, Id, Meta};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::{EntityDataSource, GroupDataSource, UserDataSource};

#[derive(Clone, Debug, Default)]
struct PrivateKeys {
    signature: Option<Arc<dyn PrivateKey>>,
    decryption: Vec<Arc<dyn PrivateKey>>,
}

#[derive(Clone, Debug, Default)]
pub struct InnerMemoryDataSource {
    metas: HashMap<Id, Meta>,
    documents: HashMap<(Id, String), Document>,
    private_keys: HashMap<Id, PrivateKeys>,
    local_users: Vec<Id>,
    contacts: HashMap<Id, Vec<Id>>,
    founders: HashMap<Id, Id>,
    owners: HashMap<Id, Id>,
    members: HashMap<Id, Vec<Id>>,
    assistants: HashMap<Id, Vec<Id>>,
}

/// An in-memory data source.
///
/// Clones share the same state, so a host (or a test) can keep a handle to add memberships or keys
/// after the data source was handed to a transceiver.
#[derive(Clone, Debug, Default)]
pub struct MemoryDataSource {
    inner: Arc<RwLock<InnerMemoryDataSource>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the data source.
    pub fn read(&self) -> RwLockReadGuard<'_, InnerMemoryDataSource> {
        self.inner.read()
    }

    /// Obtain a write-lock on the data source.
    pub fn write(&self) -> RwLockWriteGuard<'_, InnerMemoryDataSource> {
        self.inner.write()
    }

    /// Registers a user this node holds private keys for.
    ///
    /// The signing key is also the key signing the user's visa, `decryption` lists the keys tried
    /// when unwrapping message keys.
    pub fn add_local_user(
        &self,
        user: &Id,
        signature: Arc<dyn PrivateKey>,
        decryption: Vec<Arc<dyn PrivateKey>>,
    ) {
        let mut inner = self.write();
        inner.private_keys.insert(
            user.clone(),
            PrivateKeys {
                signature: Some(signature),
                decryption,
            },
        );
        if !inner.local_users.contains(user) {
            inner.local_users.push(user.clone());
        }
    }

    pub fn set_contacts(&self, user: &Id, contacts: Vec<Id>) {
        self.write().contacts.insert(user.clone(), contacts);
    }

    pub fn set_founder(&self, group: &Id, founder: &Id) {
        self.write().founders.insert(group.clone(), founder.clone());
    }

    pub fn set_owner(&self, group: &Id, owner: &Id) {
        self.write().owners.insert(group.clone(), owner.clone());
    }

    pub fn set_members(&self, group: &Id, members: Vec<Id>) {
        self.write().members.insert(group.clone(), members);
    }

    pub fn set_assistants(&self, group: &Id, assistants: Vec<Id>) {
        self.write().assistants.insert(group.clone(), assistants);
    }
}

impl EntityDataSource for MemoryDataSource {
    fn meta(&self, id: &Id) -> Option<Meta> {
        self.read().metas.get(id).cloned()
    }

    fn document(&self, id: &Id, doc_type: &str) -> Option<Document> {
        self.read()
            .documents
            .get(&(id.clone(), doc_type.to_string()))
            .cloned()
    }

    fn save_meta(&self, meta: &Meta, id: &Id) -> bool {
        let mut inner = self.write();
        if inner.metas.contains_key(id) {
            // Metas never change once published.
            return true;
        }
        inner.metas.insert(id.clone(), meta.clone());
        true
    }

    fn save_document(&self, document: &Document) -> bool {
        let key = (document.id().clone(), document.doc_type().to_string());
        let mut inner = self.write();
        if let Some(current) = inner.documents.get(&key) {
            if current.time() > document.time() {
                return false;
            }
        }
        inner.documents.insert(key, document.clone());
        true
    }
}

impl UserDataSource for MemoryDataSource {
    fn contacts(&self, user: &Id) -> Vec<Id> {
        self.read().contacts.get(user).cloned().unwrap_or_default()
    }

    fn private_keys_for_decryption(&self, user: &Id) -> Vec<Arc<dyn PrivateKey>> {
        self.read()
            .private_keys
            .get(user)
            .map(|keys| keys.decryption.clone())
            .unwrap_or_default()
    }

    fn private_key_for_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>> {
        self.read()
            .private_keys
            .get(user)
            .and_then(|keys| keys.signature.clone())
    }

    fn private_key_for_visa_signature(&self, user: &Id) -> Option<Arc<dyn PrivateKey>> {
        self.private_key_for_signature(user)
    }

    fn local_users(&self) -> Vec<Id> {
        self.read().local_users.clone()
    }
}

impl GroupDataSource for MemoryDataSource {
    fn founder(&self, group: &Id) -> Option<Id> {
        self.read().founders.get(group).cloned()
    }

    fn owner(&self, group: &Id) -> Option<Id> {
        self.read().owners.get(group).cloned()
    }

    fn members(&self, group: &Id) -> Vec<Id> {
        self.read().members.get(group).cloned().unwrap_or_default()
    }

    fn assistants(&self, group: &Id) -> Vec<Id> {
        self.read().assistants.get(group).cloned().unwrap_or_default()
    }
}
