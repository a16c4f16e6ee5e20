//! Filesystem key store.
//!
//! Each reference is stored as a single JSON file named `{name}.json`
//! inside a directory per storage class.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "keys": [ ... JWKs, newest first ... ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{JoseError, Result};
use crate::keys::{Jwk, KeyContainer, KeyReference, KeyStoreClass};
use crate::store::{apply_options, list_item, KeyListItem, KeyStore, KeyStoreOptions};

// ── File format constants ─────────────────────────────────────────────────────

const KEY_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Wrapper written to disk for each reference.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    /// Format version number.
    version: u32,
    /// Stored versions, newest first.
    keys: Vec<Jwk>,
}

// ── FileKeyStore ──────────────────────────────────────────────────────────────

/// Filesystem-backed key store.
///
/// Saves within one process are serialized, and clones share the lock.
/// Concurrent writes from multiple processes are not coordinated.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    base_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileKeyStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `JoseError::Io` if the directory cannot be created.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self {
            base_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn class_dir(&self, class: KeyStoreClass) -> PathBuf {
        self.base_dir.join(class.as_str())
    }

    fn key_path(&self, reference: &KeyReference) -> Result<PathBuf> {
        let name = reference.name();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(JoseError::InvalidArgument(format!(
                "key name cannot be used as a file name: {name:?}"
            )));
        }
        Ok(self.class_dir(reference.class()).join(format!("{name}.json")))
    }

    async fn load(&self, path: &Path) -> Result<Option<KeyContainer>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(JoseError::Io(e)),
        };
        let file: KeyFile = serde_json::from_slice(&bytes).map_err(|e| {
            JoseError::Storage(format!("failed to parse key file {}: {e}", path.display()))
        })?;
        if file.version != KEY_FILE_VERSION {
            return Err(JoseError::Storage(format!(
                "unsupported key file version {} in {}",
                file.version,
                path.display()
            )));
        }
        KeyContainer::from_versions(file.keys).map(Some)
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(
        &self,
        reference: &KeyReference,
        options: KeyStoreOptions,
    ) -> Result<KeyContainer> {
        let path = self.key_path(reference)?;
        let container = self
            .load(&path)
            .await?
            .ok_or_else(|| JoseError::KeyNotFound(reference.to_string()))?;
        apply_options(container, options)
    }

    async fn save(&self, reference: &KeyReference, key: Jwk) -> Result<()> {
        let path = self.key_path(reference)?;
        // Held across read-modify-write so no version is lost.
        let _guard = self.write_lock.lock().await;
        let container = match self.load(&path).await? {
            Some(mut container) => {
                container.push_version(key);
                container
            }
            None => KeyContainer::new(key),
        };
        let file = KeyFile {
            version: KEY_FILE_VERSION,
            keys: container.keys().to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| JoseError::Serialization(e.to_string()))?;

        write_atomic(&path, json.as_bytes()).await?;
        log::debug!("Wrote {} versions to {}", container.len(), path.display());
        Ok(())
    }

    async fn list(
        &self,
        class: KeyStoreClass,
        options: KeyStoreOptions,
    ) -> Result<BTreeMap<String, KeyListItem>> {
        let dir = self.class_dir(class);
        let mut items = BTreeMap::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
            Err(e) => return Err(JoseError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_string_lossy().strip_suffix(".json").map(str::to_string)
            else {
                continue;
            };
            if let Some(container) = self.load(&entry.path()).await? {
                items.insert(name, list_item(&container, options));
            }
        }
        Ok(items)
    }
}

/// Write to a sibling temp file, then rename into place.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, data).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
