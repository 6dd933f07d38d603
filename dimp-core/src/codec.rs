// SPDX-License-Identifier: MIT OR Apache-2.0

//! Utility methods to encode or decode maps in JSON format, and the base64 and UTF-8 helpers used
//! across the message pipeline.
//!
//! Every message, content, meta and document in DIMP is backed by a string-keyed [`Map`]. The map
//! keeps its keys ordered, so encoding the same map twice always yields the same bytes. Nodes sign
//! exactly the bytes they produce with [`json_encode`], receivers verify these bytes as they came
//! over the wire.
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// String-keyed JSON object backing all protocol values.
pub type Map = serde_json::Map<String, Value>;

/// Serializes a value into JSON bytes.
pub fn json_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let bytes = serde_json::to_vec(value)?;
    Ok(bytes)
}

/// Deserializes a value which was formatted in JSON.
pub fn json_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let value = serde_json::from_slice::<T>(bytes)?;
    Ok(value)
}

/// Deserializes bytes into a JSON object, rejecting any other JSON value.
pub fn json_decode_map(bytes: &[u8]) -> Result<Map, DecodeError> {
    match json_decode::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject),
    }
}

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a base64 string, returns `None` when the input is malformed.
pub fn base64_decode(value: &str) -> Option<Vec<u8>> {
    STANDARD.decode(value.trim()).ok()
}

pub fn utf8_encode(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Decodes UTF-8 bytes, returns `None` when the input is not valid UTF-8.
pub fn utf8_decode(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

/// Reads a string value from a map.
pub fn get_str<'a>(map: &'a Map, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Reads a nested object from a map.
pub fn get_map<'a>(map: &'a Map, key: &str) -> Option<&'a Map> {
    map.get(key).and_then(Value::as_object)
}

/// Reads a number from a map, accepting integers, floats and numeric strings.
pub fn get_f64(map: &Map, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(value) => value.parse().ok(),
        _ => None,
    }
}

/// An error occurred during JSON serialization.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("an error occurred while serializing value: {0}")]
    Value(#[from] serde_json::Error),
}

/// An error occurred during JSON deserialization.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes are not valid JSON or do not match the expected shape.
    #[error("an error occurred while parsing bytes: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Map, base64_decode, base64_encode, get_f64, json_decode_map, json_encode, utf8_decode,
    };

    #[test]
    fn encode_decode() {
        let mut map = Map::new();
        map.insert("sender".into(), json!("alice"));
        map.insert("time".into(), json!(1700000000.5));
        map.insert("keys".into(), json!({ "bob": "abc", "carol": "def" }));

        let bytes = json_encode(&map).unwrap();
        let map_again = json_decode_map(&bytes).unwrap();
        assert_eq!(map, map_again);
    }

    #[test]
    fn stable_key_order() {
        let mut map_1 = Map::new();
        map_1.insert("b".into(), json!(2));
        map_1.insert("a".into(), json!(1));

        let mut map_2 = Map::new();
        map_2.insert("a".into(), json!(1));
        map_2.insert("b".into(), json!(2));

        assert_eq!(json_encode(&map_1).unwrap(), json_encode(&map_2).unwrap());
        assert_eq!(json_encode(&map_1).unwrap(), br#"{"a":1,"b":2}"#.to_vec());
    }

    #[test]
    fn reject_non_objects() {
        assert!(json_decode_map(b"[1, 2, 3]").is_err());
        assert!(json_decode_map(b"{ not json").is_err());
    }

    #[test]
    fn malformed_input_yields_none() {
        assert_eq!(base64_decode("!!!"), None);
        assert_eq!(utf8_decode(&[0xff, 0xfe]), None);
        assert_eq!(base64_decode(&base64_encode(b"hello")), Some(b"hello".to_vec()));
    }

    #[test]
    fn numbers_from_strings() {
        let mut map = Map::new();
        map.insert("time".into(), json!("1700000000"));
        map.insert("sn".into(), json!(1001));
        assert_eq!(get_f64(&map, "time"), Some(1700000000.0));
        assert_eq!(get_f64(&map, "sn"), Some(1001.0));
        assert_eq!(get_f64(&map, "missing"), None);
    }
}
