//! In-memory key store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{JoseError, Result};
use crate::keys::{Jwk, KeyContainer, KeyReference, KeyStoreClass};
use crate::store::{apply_options, list_item, KeyListItem, KeyStore, KeyStoreOptions};

/// Key store holding every version in process memory.
///
/// Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<(KeyStoreClass, String), KeyContainer>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(
        &self,
        reference: &KeyReference,
        options: KeyStoreOptions,
    ) -> Result<KeyContainer> {
        let entries = self.entries.read().await;
        let container = entries
            .get(&(reference.class(), reference.name().to_string()))
            .cloned()
            .ok_or_else(|| JoseError::KeyNotFound(reference.to_string()))?;
        apply_options(container, options)
    }

    async fn save(&self, reference: &KeyReference, key: Jwk) -> Result<()> {
        let mut entries = self.entries.write().await;
        let slot = (reference.class(), reference.name().to_string());
        match entries.get_mut(&slot) {
            Some(container) => container.push_version(key),
            None => {
                entries.insert(slot, KeyContainer::new(key));
            }
        }
        log::debug!("Stored new version of {reference}");
        Ok(())
    }

    async fn list(
        &self,
        class: KeyStoreClass,
        options: KeyStoreOptions,
    ) -> Result<BTreeMap<String, KeyListItem>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|((c, _), _)| *c == class)
            .map(|((_, name), container)| (name.clone(), list_item(container, options)))
            .collect())
    }
}
