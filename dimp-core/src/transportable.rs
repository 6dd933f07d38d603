// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary payloads which can travel inside JSON values.
//!
//! Attachments, wrapped keys and thumbnails are carried as strings. A [`TransportableData`] value
//! wraps such a string in one of three forms:
//!
//! * base64 encoded bytes: `aGVsbG8=`
//! * plain text, used for zero-length payloads: `` (empty string)
//! * [RFC 2397] data URI with an explicit mime type: `data:image/png;base64,aGVsbG8=`
//!
//! Bytes are decoded lazily on first access. Malformed input never fails, it materializes as an
//! empty byte sequence instead.
//!
//! [RFC 2397]: https://www.rfc-editor.org/rfc/rfc2397
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{base64_decode, base64_encode, utf8_encode};

const DATA_URI_SCHEME: &str = "data:";

const BASE64_MARKER: &str = ";base64,";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    Plain,
}

#[derive(Clone)]
pub struct TransportableData {
    encoded: String,
    encoding: Encoding,
    mime_type: Option<String>,
    bytes: OnceLock<Vec<u8>>,
}

impl TransportableData {
    /// Wraps bytes for transport, choosing base64 unless the payload is empty.
    pub fn new(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::plain("");
        }
        let bytes_lock = OnceLock::new();
        let _ = bytes_lock.set(bytes.to_vec());
        Self {
            encoded: base64_encode(bytes),
            encoding: Encoding::Base64,
            mime_type: None,
            bytes: bytes_lock,
        }
    }

    /// Wraps a UTF-8 string without any further encoding.
    pub fn plain(text: &str) -> Self {
        Self {
            encoded: text.to_string(),
            encoding: Encoding::Plain,
            mime_type: None,
            bytes: OnceLock::new(),
        }
    }

    /// Embeds bytes as a base64 data URI with the given mime type.
    pub fn data_uri(mime_type: &str, bytes: &[u8]) -> Self {
        let bytes_lock = OnceLock::new();
        let _ = bytes_lock.set(bytes.to_vec());
        Self {
            encoded: base64_encode(bytes),
            encoding: Encoding::Base64,
            mime_type: Some(mime_type.to_string()),
            bytes: bytes_lock,
        }
    }

    /// Parses the string form, bytes stay encoded until they are requested.
    pub fn parse(value: &str) -> Self {
        if value.is_empty() {
            return Self::plain("");
        }

        if let Some(rest) = value.strip_prefix(DATA_URI_SCHEME) {
            if let Some((mime_type, body)) = rest.split_once(BASE64_MARKER) {
                return Self {
                    encoded: body.to_string(),
                    encoding: Encoding::Base64,
                    mime_type: Some(mime_type.to_string()),
                    bytes: OnceLock::new(),
                };
            }

            // Data URIs without base64 marker carry their body as plain text.
            if let Some((mime_type, body)) = rest.split_once(',') {
                return Self {
                    encoded: body.to_string(),
                    encoding: Encoding::Plain,
                    mime_type: Some(mime_type.to_string()),
                    bytes: OnceLock::new(),
                };
            }
        }

        Self {
            encoded: value.to_string(),
            encoding: Encoding::Base64,
            mime_type: None,
            bytes: OnceLock::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Decoded bytes, empty when the encoded string was malformed.
    pub fn bytes(&self) -> &[u8] {
        self.bytes.get_or_init(|| match self.encoding {
            Encoding::Base64 => base64_decode(&self.encoded).unwrap_or_default(),
            Encoding::Plain => utf8_encode(&self.encoded),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Returns the string form which goes into a content map.
    pub fn serialize(&self) -> String {
        match (&self.mime_type, self.encoding) {
            (Some(mime_type), Encoding::Base64) => {
                format!("{DATA_URI_SCHEME}{mime_type}{BASE64_MARKER}{}", self.encoded)
            }
            (Some(mime_type), Encoding::Plain) => {
                format!("{DATA_URI_SCHEME}{mime_type},{}", self.encoded)
            }
            (None, _) => self.encoded.clone(),
        }
    }
}

impl PartialEq for TransportableData {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for TransportableData {}

impl fmt::Debug for TransportableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportableData")
            .field("encoding", &self.encoding)
            .field("mime_type", &self.mime_type)
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for TransportableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

impl Serialize for TransportableData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&TransportableData::serialize(self))
    }
}

impl<'de> Deserialize<'de> for TransportableData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, TransportableData};

    #[test]
    fn base64_form() {
        let data = TransportableData::new(b"hello");
        assert_eq!(data.serialize(), "aGVsbG8=");
        assert_eq!(data.encoding(), Encoding::Base64);

        let parsed = TransportableData::parse("aGVsbG8=");
        assert_eq!(parsed.bytes(), b"hello");
        assert_eq!(parsed, data);
    }

    #[test]
    fn data_uri_form() {
        let data = TransportableData::data_uri("image/png", &[1, 2, 3]);
        let encoded = data.serialize();
        assert_eq!(encoded, "data:image/png;base64,AQID");

        let parsed = TransportableData::parse(&encoded);
        assert_eq!(parsed.mime_type(), Some("image/png"));
        assert_eq!(parsed.bytes(), &[1, 2, 3]);
        assert_eq!(parsed.serialize(), encoded);
    }

    #[test]
    fn equality_compares_bytes() {
        let base64 = TransportableData::new(&[1, 2, 3]);
        let data_uri = TransportableData::data_uri("application/octet-stream", &[1, 2, 3]);
        assert_eq!(base64, data_uri);
    }

    #[test]
    fn zero_length_payload() {
        let data = TransportableData::new(&[]);
        assert_eq!(data.encoding(), Encoding::Plain);
        assert_eq!(data.serialize(), "");

        let parsed = TransportableData::parse(&data.serialize());
        assert_eq!(parsed.encoding(), Encoding::Plain);
        assert_eq!(parsed.len(), 0);
        assert!(parsed.is_empty());
    }

    #[test]
    fn malformed_base64_is_empty() {
        let data = TransportableData::parse("!!!");
        assert!(data.is_empty());
        assert_eq!(data.serialize(), "!!!");
    }
}
