// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed property bags describing users (visa) and groups (bulletin).
//!
//! The properties are serialized into the `data` string and signed, `data` and `signature` are
//! either both present or both absent. Changing any property invalidates the signature until the
//! document is signed again.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use thiserror::Error;

use crate::codec::{
    EncodeError, Map, base64_decode, base64_encode, get_f64, get_map, get_str, json_decode_map,
    json_encode, utf8_decode,
};
use crate::crypto::{CryptoError, CryptoProvider, PrivateKey, PublicKey};
use crate::identity::Id;
use crate::timestamp::now;

/// Document of a user, carries the key others encrypt messages with.
pub const VISA: &str = "visa";

/// Document of a group, carries the founder and assistants.
pub const BULLETIN: &str = "bulletin";

/// Generic document type.
pub const PROFILE: &str = "profile";

#[derive(Debug)]
pub struct Document {
    id: Id,
    doc_type: String,
    properties: Map,
    data: Option<String>,
    signature: Option<Vec<u8>>,
    verified: AtomicBool,
}

impl Document {
    /// Creates an empty, unsigned document.
    pub fn new(id: Id, doc_type: &str) -> Self {
        Self {
            id,
            doc_type: doc_type.to_string(),
            properties: Map::new(),
            data: None,
            signature: None,
            verified: AtomicBool::new(false),
        }
    }

    pub fn from_map(map: &Map) -> Result<Self, DocumentError> {
        let id = get_str(map, "ID")
            .ok_or(DocumentError::MissingField("ID"))
            .and_then(|id| Id::parse(id).map_err(|_| DocumentError::InvalidId))?;

        let data = get_str(map, "data").map(str::to_string);
        let signature = get_str(map, "signature").and_then(base64_decode);

        // Unparseable data leaves the properties empty, the signature check still runs against
        // the original string.
        let properties = data
            .as_deref()
            .and_then(|data| json_decode_map(data.as_bytes()).ok())
            .unwrap_or_default();

        let doc_type = get_str(map, "type")
            .or_else(|| get_str(&properties, "type"))
            .map(str::to_string)
            .unwrap_or_else(|| {
                if id.is_group() {
                    BULLETIN.to_string()
                } else {
                    VISA.to_string()
                }
            });

        Ok(Self {
            id,
            doc_type,
            properties,
            data,
            signature,
            verified: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn properties(&self) -> &Map {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Sets a property, clearing data and signature.
    pub fn set_property(&mut self, key: &str, value: Value) {
        self.properties.insert(key.to_string(), value);
        self.reset();
    }

    /// Removes a property, clearing data and signature.
    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        let value = self.properties.remove(key);
        self.reset();
        value
    }

    fn reset(&mut self) {
        self.data = None;
        self.signature = None;
        *self.verified.get_mut() = false;
    }

    pub fn time(&self) -> Option<f64> {
        get_f64(&self.properties, "time")
    }

    pub fn name(&self) -> Option<&str> {
        get_str(&self.properties, "name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.set_property("name", json!(name));
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Returns true after the document was signed locally or verified successfully.
    pub fn is_valid(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    /// Stamps the current time into the properties and signs their canonical encoding.
    pub fn sign(&mut self, private_key: &dyn PrivateKey) -> Result<(), DocumentError> {
        self.properties.insert("ID".into(), json!(self.id.to_string()));
        self.properties.insert("type".into(), json!(self.doc_type));
        self.properties.insert("time".into(), json!(now()));

        let data = utf8_decode(&json_encode(&self.properties)?).ok_or(DocumentError::InvalidData)?;
        let signature = private_key.sign(data.as_bytes())?;

        self.data = Some(data);
        self.signature = Some(signature);
        *self.verified.get_mut() = true;
        Ok(())
    }

    /// Checks the signature over `data` with the entity's signing key.
    pub fn verify(&self, public_key: &dyn PublicKey) -> bool {
        if self.is_valid() {
            return true;
        }
        let (Some(data), Some(signature)) = (&self.data, &self.signature) else {
            return false;
        };
        let valid = public_key.verify(data.as_bytes(), signature);
        if valid {
            self.verified.store(true, Ordering::Release);
        }
        valid
    }

    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("ID".into(), json!(self.id.to_string()));
        map.insert("type".into(), json!(self.doc_type));
        if let (Some(data), Some(signature)) = (&self.data, &self.signature) {
            map.insert("data".into(), json!(data));
            map.insert("signature".into(), json!(base64_encode(signature)));
        }
        map
    }

    // Visa

    /// Public key others use to encrypt messages towards this user.
    pub fn public_key(&self, provider: &dyn CryptoProvider) -> Option<Arc<dyn PublicKey>> {
        let key = get_map(&self.properties, "key")?;
        provider.parse_public_key(key).ok()
    }

    pub fn set_public_key(&mut self, public_key: &dyn PublicKey) {
        self.set_property("key", Value::Object(public_key.to_map()));
    }

    pub fn avatar(&self) -> Option<&str> {
        get_str(&self.properties, "avatar")
    }

    pub fn set_avatar(&mut self, url: &str) {
        self.set_property("avatar", json!(url));
    }

    // Bulletin

    pub fn founder(&self) -> Option<Id> {
        get_str(&self.properties, "founder").and_then(|id| Id::parse(id).ok())
    }

    pub fn set_founder(&mut self, founder: &Id) {
        self.set_property("founder", json!(founder.to_string()));
    }

    pub fn assistants(&self) -> Vec<Id> {
        self.properties
            .get("assistants")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|id| Id::parse(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_assistants(&mut self, assistants: &[Id]) {
        let values: Vec<Value> = assistants.iter().map(|id| json!(id.to_string())).collect();
        self.set_property("assistants", Value::Array(values));
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            doc_type: self.doc_type.clone(),
            properties: self.properties.clone(),
            data: self.data.clone(),
            signature: self.signature.clone(),
            verified: AtomicBool::new(self.is_valid()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is missing field '{0}'")]
    MissingField(&'static str),

    #[error("document has an invalid identifier")]
    InvalidId,

    #[error("document data is not valid utf-8")]
    InvalidData,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
