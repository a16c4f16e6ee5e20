//! Ordered JOSE headers.
//!
//! Member order is part of the encoded form, and the encoded protected
//! header is signed (JWS) or authenticated (JWE). Headers therefore keep
//! insertion order, and a protected header keeps the exact text it was
//! decoded from.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{JoseError, Result};

/// Insertion-ordered header members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header(IndexMap<String, Value>);

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a member, keeping its original position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder form of [`Header::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A member's value when it is a JSON string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    pub fn alg(&self) -> Option<&str> {
        self.get_str("alg")
    }

    pub fn enc(&self) -> Option<&str> {
        self.get_str("enc")
    }

    pub fn kid(&self) -> Option<&str> {
        self.get_str("kid")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Append members of `other` that are not already present.
    pub fn extend_missing(&mut self, other: &Header) {
        for (name, value) in other.iter() {
            if !self.contains(name) {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }
}

impl FromIterator<(String, Value)> for Header {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A header that travels base64url-encoded and is covered by the signature
/// or authentication tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedHeader {
    header: Header,
    encoded: String,
}

impl ProtectedHeader {
    /// Encode `header`. An empty header encodes to the empty string.
    pub fn new(header: Header) -> Result<Self> {
        let encoded = if header.is_empty() {
            String::new()
        } else {
            let json = serde_json::to_vec(&header)
                .map_err(|e| JoseError::Serialization(e.to_string()))?;
            b64url_encode(json)
        };
        Ok(Self { header, encoded })
    }

    /// Decode a received protected header, keeping `encoded` verbatim.
    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Ok(Self::default());
        }
        let json = b64url_decode(encoded, "protected")?;
        let header: Header = serde_json::from_slice(&json)
            .map_err(|e| JoseError::Serialization(format!("protected header: {e}")))?;
        Ok(Self {
            header,
            encoded: encoded.to_string(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }
}
