//! Logical key references.
//!
//! A [`KeyReference`] names key material inside a key store without
//! exposing it. It is a plain value: cloning it never clones key bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The storage class a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreClass {
    /// Asymmetric key pairs.
    Key,
    /// Symmetric secrets such as pairwise master seeds.
    Secret,
}

impl KeyStoreClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStoreClass::Key => "key",
            KeyStoreClass::Secret => "secret",
        }
    }
}

impl fmt::Display for KeyStoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies key material by name, storage class and optional remote alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyReference {
    name: String,
    class: KeyStoreClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_key_reference: Option<String>,
}

impl KeyReference {
    pub fn new(name: impl Into<String>, class: KeyStoreClass) -> Self {
        Self {
            name: name.into(),
            class,
            remote_key_reference: None,
        }
    }

    /// Reference into the `key` storage class.
    pub fn key(name: impl Into<String>) -> Self {
        Self::new(name, KeyStoreClass::Key)
    }

    /// Reference into the `secret` storage class.
    pub fn secret(name: impl Into<String>) -> Self {
        Self::new(name, KeyStoreClass::Secret)
    }

    /// Attach the alias a remote backend knows this key by.
    pub fn with_remote(mut self, alias: impl Into<String>) -> Self {
        self.remote_key_reference = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> KeyStoreClass {
        self.class
    }

    pub fn remote_key_reference(&self) -> Option<&str> {
        self.remote_key_reference.as_deref()
    }
}

impl fmt::Display for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class, self.name)
    }
}
