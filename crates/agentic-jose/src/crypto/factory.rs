//! Adapter registry.
//!
//! The factory binds (capability kind, algorithm) pairs to
//! [`PrimitiveAdapter`] instances, each registered for one key scope and a
//! set of storage classes. Every operation resolves its adapter here at call
//! time, so a vault-backed signer and a local verifier can serve the same
//! algorithm side by side.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::algorithms::{supported_algorithms, to_compact_id, AlgorithmDescriptor};
use crate::config::JoseConfig;
use crate::crypto::adapter::PrimitiveAdapter;
use crate::crypto::software::SoftwareAdapter;
use crate::error::{JoseError, Result};
use crate::keys::{KeyReference, KeyStoreClass};
use crate::store::{KeyStore, MemoryKeyStore};

/// Algorithm id that matches any algorithm of a capability kind.
pub const ANY_ALGORITHM: &str = "*";

/// The kind of capability an adapter provides for an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    MessageSigner,
    KeyEncrypter,
    SymmetricEncrypter,
    MacSigner,
    Digest,
}

impl CapabilityKind {
    /// The kind that serves a structured descriptor.
    pub fn for_descriptor(descriptor: &AlgorithmDescriptor) -> Self {
        match descriptor {
            AlgorithmDescriptor::Ecdsa { .. }
            | AlgorithmDescriptor::EdDsa { .. }
            | AlgorithmDescriptor::RsassaPkcs1V15 { .. } => CapabilityKind::MessageSigner,
            AlgorithmDescriptor::RsaOaep { .. } => CapabilityKind::KeyEncrypter,
            AlgorithmDescriptor::AesGcm { .. } => CapabilityKind::SymmetricEncrypter,
            AlgorithmDescriptor::Hmac { .. } => CapabilityKind::MacSigner,
            AlgorithmDescriptor::Digest { .. } => CapabilityKind::Digest,
        }
    }

    /// The kind that serves an algorithm given by structured family name or
    /// compact id.
    pub fn for_algorithm_name(name: &str) -> Result<Self> {
        let upper = name.to_ascii_uppercase();
        let kind = match upper.as_str() {
            "ECDSA" | "EDDSA" | "RSASSA-PKCS1-V1_5" | "ES256K" | "RS256" | "RS384" | "RS512" => {
                CapabilityKind::MessageSigner
            }
            "RSA-OAEP" | "RSA-OAEP-256" => CapabilityKind::KeyEncrypter,
            "AES-GCM" | "A128GCM" | "A192GCM" | "A256GCM" => CapabilityKind::SymmetricEncrypter,
            "HMAC" | "HS256" | "HS384" | "HS512" => CapabilityKind::MacSigner,
            "SHA-256" | "SHA-384" | "SHA-512" => CapabilityKind::Digest,
            _ => return Err(JoseError::UnsupportedAlgorithm(name.to_string())),
        };
        Ok(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::MessageSigner => "message-signer",
            CapabilityKind::KeyEncrypter => "key-encrypter",
            CapabilityKind::SymmetricEncrypter => "symmetric-encrypter",
            CapabilityKind::MacSigner => "mac-signer",
            CapabilityKind::Digest => "digest",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an operation works on locally materialized key material or on
/// protected private material held in the key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Public,
    Private,
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::Public => f.write_str("public"),
            KeyScope::Private => f.write_str("private"),
        }
    }
}

/// One adapter bound to a scope and the storage classes it can reach.
#[derive(Clone)]
pub struct Registration {
    adapter: Arc<dyn PrimitiveAdapter>,
    scope: KeyScope,
    storage_classes: Vec<KeyStoreClass>,
}

impl Registration {
    pub fn new(
        adapter: Arc<dyn PrimitiveAdapter>,
        scope: KeyScope,
        storage_classes: impl IntoIterator<Item = KeyStoreClass>,
    ) -> Self {
        Self {
            adapter,
            scope,
            storage_classes: storage_classes.into_iter().collect(),
        }
    }

    pub fn adapter(&self) -> &Arc<dyn PrimitiveAdapter> {
        &self.adapter
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    pub fn storage_classes(&self) -> &[KeyStoreClass] {
        &self.storage_classes
    }

    fn serves(&self, scope: KeyScope, reference: Option<&KeyReference>) -> bool {
        self.scope == scope
            && reference.map_or(true, |r| self.storage_classes.contains(&r.class()))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("adapter", &self.adapter.name())
            .field("scope", &self.scope)
            .field("storage_classes", &self.storage_classes)
            .finish()
    }
}

/// Engine context: configuration, key store and adapter registry.
///
/// Build one per process (or per test) and pass it by reference into every
/// operation.
pub struct CryptoFactory {
    config: JoseConfig,
    key_store: Arc<dyn KeyStore>,
    registry: HashMap<(CapabilityKind, String), Vec<Registration>>,
}

impl CryptoFactory {
    /// A factory with an empty registry.
    pub fn new(config: JoseConfig, key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            config,
            key_store,
            registry: HashMap::new(),
        }
    }

    /// A factory with the software adapter registered for every supported
    /// algorithm, both scopes and both storage classes.
    pub fn with_defaults(config: JoseConfig, key_store: Arc<dyn KeyStore>) -> Self {
        let mut factory = Self::new(config, key_store);
        let adapter: Arc<dyn PrimitiveAdapter> = Arc::new(SoftwareAdapter::new());
        for family in supported_algorithms() {
            for id in family.compact_ids {
                let Ok(kind) = CapabilityKind::for_algorithm_name(id) else {
                    continue;
                };
                for scope in [KeyScope::Public, KeyScope::Private] {
                    factory.register(
                        kind,
                        id,
                        Registration::new(
                            adapter.clone(),
                            scope,
                            [KeyStoreClass::Key, KeyStoreClass::Secret],
                        ),
                    );
                }
            }
        }
        factory
    }

    /// Default configuration over a fresh in-memory key store.
    pub fn in_memory() -> Self {
        Self::with_defaults(JoseConfig::default(), Arc::new(MemoryKeyStore::new()))
    }

    pub fn config(&self) -> &JoseConfig {
        &self.config
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// Bind an adapter to `(kind, algorithm)`. Use [`ANY_ALGORITHM`] to cover
    /// every algorithm of the kind. Later registrations take precedence.
    pub fn register(
        &mut self,
        kind: CapabilityKind,
        algorithm: &str,
        registration: Registration,
    ) -> &mut Self {
        log::debug!(
            "Registering {} adapter for {kind} {algorithm} ({} scope)",
            registration.adapter.name(),
            registration.scope
        );
        self.registry
            .entry((kind, algorithm.to_string()))
            .or_default()
            .insert(0, registration);
        self
    }

    /// Find the adapter for `(kind, algorithm)` in `scope`.
    ///
    /// With a key reference, only registrations covering its storage class
    /// qualify. Exact algorithm entries are preferred over wildcard entries.
    pub fn resolve(
        &self,
        kind: CapabilityKind,
        algorithm: &str,
        scope: KeyScope,
        key_reference: Option<&KeyReference>,
    ) -> Result<Arc<dyn PrimitiveAdapter>> {
        let found = [algorithm, ANY_ALGORITHM]
            .iter()
            .filter_map(|id| self.registry.get(&(kind, id.to_string())))
            .flatten()
            .find(|registration| registration.serves(scope, key_reference));

        match found {
            Some(registration) => {
                log::debug!(
                    "Resolved {kind} {algorithm} ({scope}) to {} adapter",
                    registration.adapter.name()
                );
                Ok(registration.adapter.clone())
            }
            None => Err(JoseError::NoRegisteredAdapter {
                kind,
                algorithm: algorithm.to_string(),
                scope,
            }),
        }
    }

    /// Resolve the adapter for a structured descriptor.
    ///
    /// The capability kind follows from the descriptor's family.
    pub fn get_subtle_crypto_for_algorithm(
        &self,
        descriptor: &AlgorithmDescriptor,
        scope: KeyScope,
        key_reference: Option<&KeyReference>,
    ) -> Result<Arc<dyn PrimitiveAdapter>> {
        let kind = CapabilityKind::for_descriptor(descriptor);
        let compact_id = to_compact_id(descriptor)?;
        self.resolve(kind, &compact_id, scope, key_reference)
    }
}

impl fmt::Debug for CryptoFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoFactory")
            .field("config", &self.config)
            .field("registrations", &self.registry.len())
            .finish()
    }
}
