//! Key store contract and reference backends.
//!
//! - `memory`: in-process store, the default for tests and short-lived engines
//! - `file`: one JSON document per key reference on the local filesystem

pub mod file;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keys::{Jwk, KeyContainer, KeyReference, KeyStoreClass, KeyType};

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

/// Filters applied when reading from a key store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStoreOptions {
    /// Strip private members before returning material.
    pub public_key_only: bool,
    /// Return only the newest version.
    pub latest_version: bool,
}

impl KeyStoreOptions {
    /// Newest version, private members included.
    pub fn latest() -> Self {
        Self {
            public_key_only: false,
            latest_version: true,
        }
    }

    /// Newest version, public members only.
    pub fn latest_public() -> Self {
        Self {
            public_key_only: true,
            latest_version: true,
        }
    }
}

/// Summary of one stored reference as returned by [`KeyStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyListItem {
    /// Key identifiers of every stored version, newest first.
    pub kids: Vec<String>,
    pub kty: KeyType,
}

/// Persists key material by logical reference.
///
/// Implementations own their locking. Callers treat a store as an opaque
/// shared capability.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the stored versions for `reference`.
    ///
    /// Fails with `KeyNotFound` when nothing is stored under the reference.
    async fn get(&self, reference: &KeyReference, options: KeyStoreOptions)
        -> Result<KeyContainer>;

    /// Store `key` as the newest version of `reference`.
    async fn save(&self, reference: &KeyReference, key: Jwk) -> Result<()>;

    /// Every reference stored in `class`, keyed by name.
    async fn list(
        &self,
        class: KeyStoreClass,
        options: KeyStoreOptions,
    ) -> Result<BTreeMap<String, KeyListItem>>;
}

/// Apply read options to a container fetched by a backend.
pub(crate) fn apply_options(
    container: KeyContainer,
    options: KeyStoreOptions,
) -> Result<KeyContainer> {
    let container = if options.latest_version {
        container.latest_only()
    } else {
        container
    };
    if options.public_key_only {
        container.public_only()
    } else {
        Ok(container)
    }
}

pub(crate) fn list_item(container: &KeyContainer, options: KeyStoreOptions) -> KeyListItem {
    let kids = if options.latest_version {
        container.latest_only().kids()
    } else {
        container.kids()
    };
    KeyListItem {
        kids,
        kty: container.kty(),
    }
}
