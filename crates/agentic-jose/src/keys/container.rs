//! Versioned key containers returned by key stores.

use serde::{Deserialize, Serialize};

use crate::error::{JoseError, Result};
use crate::keys::jwk::{Jwk, KeyType};

/// All stored versions of one key reference, newest first.
///
/// A container is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyVersions")]
pub struct KeyContainer {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct KeyVersions {
    keys: Vec<Jwk>,
}

impl TryFrom<KeyVersions> for KeyContainer {
    type Error = JoseError;

    fn try_from(versions: KeyVersions) -> Result<Self> {
        Self::from_versions(versions.keys)
    }
}

impl KeyContainer {
    pub fn new(key: Jwk) -> Self {
        Self { keys: vec![key] }
    }

    /// Build from versions ordered newest first.
    pub fn from_versions(keys: Vec<Jwk>) -> Result<Self> {
        if keys.is_empty() {
            return Err(JoseError::Storage(
                "key container needs at least one version".into(),
            ));
        }
        Ok(Self { keys })
    }

    /// Add a version that becomes the newest.
    pub fn push_version(&mut self, key: Jwk) {
        self.keys.insert(0, key);
    }

    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    pub fn latest(&self) -> &Jwk {
        &self.keys[0]
    }

    pub fn into_latest(mut self) -> Jwk {
        self.keys.swap_remove(0)
    }

    pub fn kty(&self) -> KeyType {
        self.latest().kty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Keep only the newest version.
    pub fn latest_only(&self) -> Self {
        Self::new(self.latest().clone())
    }

    /// Strip private members from every version.
    pub fn public_only(&self) -> Result<Self> {
        let keys = self
            .keys
            .iter()
            .map(Jwk::to_public)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// The `kid` of every version that carries one.
    pub fn kids(&self) -> Vec<String> {
        self.keys
            .iter()
            .filter_map(|k| k.kid().map(str::to_string))
            .collect()
    }
}
