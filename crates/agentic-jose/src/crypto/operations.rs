//! Crypto operations by key reference or by raw key.
//!
//! Each operation maps the compact algorithm id to a descriptor, resolves an
//! adapter through the [`CryptoFactory`], imports the key and delegates.
//! Key-reference operations run in private scope and import store material
//! as non-extractable; raw-key operations run in public scope.

use std::sync::Arc;

use crate::algorithms::{
    resolve_key_import_descriptor, to_descriptor, AlgorithmDescriptor, DescriptorContext,
};
use crate::crypto::adapter::{CryptoKey, PrimitiveAdapter};
use crate::crypto::factory::{CapabilityKind, CryptoFactory, KeyScope};
use crate::crypto::keys::KeyGenParams;
use crate::error::Result;
use crate::keys::{Jwk, KeyReference};
use crate::store::KeyStoreOptions;

pub use crate::crypto::pairwise::generate_pairwise_key;

/// Newest private material stored under `key_reference`.
pub(crate) async fn fetch_private_key(
    factory: &CryptoFactory,
    key_reference: &KeyReference,
) -> Result<Jwk> {
    let container = factory
        .key_store()
        .get(key_reference, KeyStoreOptions::latest())
        .await?;
    Ok(container.into_latest())
}

async fn prepare(
    factory: &CryptoFactory,
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
    scope: KeyScope,
    key_reference: Option<&KeyReference>,
) -> Result<(Arc<dyn PrimitiveAdapter>, CryptoKey)> {
    let adapter = factory.get_subtle_crypto_for_algorithm(descriptor, scope, key_reference)?;
    let import = resolve_key_import_descriptor(descriptor, key)?;
    let extractable = scope == KeyScope::Public;
    let crypto_key = adapter.import_key(&import, key, extractable).await?;
    Ok((adapter, crypto_key))
}

/// Sign `data` with the newest private key stored under `key_reference`.
///
/// Fails with `KeyNotFound` when the reference holds nothing.
pub async fn sign_by_key_reference(
    factory: &CryptoFactory,
    algorithm: &str,
    key_reference: &KeyReference,
    data: &[u8],
) -> Result<Vec<u8>> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let key = fetch_private_key(factory, key_reference).await?;
    sign_with_private(factory, &descriptor, &key, key_reference, data).await
}

/// Sign with an already fetched private key that belongs to `key_reference`.
pub(crate) async fn sign_with_private(
    factory: &CryptoFactory,
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
    key_reference: &KeyReference,
    data: &[u8],
) -> Result<Vec<u8>> {
    let (adapter, crypto_key) = prepare(
        factory,
        descriptor,
        key,
        KeyScope::Private,
        Some(key_reference),
    )
    .await?;
    adapter.sign(descriptor, &crypto_key, data).await
}

/// Sign `data` with a key held by the caller.
pub async fn sign_with_key(
    factory: &CryptoFactory,
    algorithm: &str,
    key: &Jwk,
    data: &[u8],
) -> Result<Vec<u8>> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let (adapter, crypto_key) = prepare(factory, &descriptor, key, KeyScope::Public, None).await?;
    adapter.sign(&descriptor, &crypto_key, data).await
}

/// Verify `signature` over `data`. A mismatch is `Ok(false)`.
pub async fn verify_by_public_key(
    factory: &CryptoFactory,
    algorithm: &str,
    public_key: &Jwk,
    signature: &[u8],
    data: &[u8],
) -> Result<bool> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let (adapter, crypto_key) =
        prepare(factory, &descriptor, public_key, KeyScope::Public, None).await?;
    adapter
        .verify(&descriptor, &crypto_key, signature, data)
        .await
}

/// Wrap `data` (typically a content key) for the holder of `public_key`.
pub async fn encrypt_by_public_key(
    factory: &CryptoFactory,
    algorithm: &str,
    public_key: &Jwk,
    data: &[u8],
) -> Result<Vec<u8>> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let (adapter, crypto_key) =
        prepare(factory, &descriptor, public_key, KeyScope::Public, None).await?;
    adapter.encrypt(&descriptor, &crypto_key, data).await
}

/// Unwrap `data` with the newest private key stored under `key_reference`.
pub async fn decrypt_by_key_reference(
    factory: &CryptoFactory,
    algorithm: &str,
    key_reference: &KeyReference,
    data: &[u8],
) -> Result<Vec<u8>> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let key = fetch_private_key(factory, key_reference).await?;
    decrypt_with_private(factory, &descriptor, &key, key_reference, data).await
}

/// Decrypt with an already fetched private key that belongs to `key_reference`.
pub(crate) async fn decrypt_with_private(
    factory: &CryptoFactory,
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
    key_reference: &KeyReference,
    data: &[u8],
) -> Result<Vec<u8>> {
    let (adapter, crypto_key) = prepare(
        factory,
        descriptor,
        key,
        KeyScope::Private,
        Some(key_reference),
    )
    .await?;
    adapter.decrypt(descriptor, &crypto_key, data).await
}

/// Encrypt with a caller-held key. Content encryption passes an AES-GCM
/// descriptor carrying its IV and additional data.
pub async fn encrypt_with_key(
    factory: &CryptoFactory,
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
    data: &[u8],
) -> Result<Vec<u8>> {
    let (adapter, crypto_key) = prepare(factory, descriptor, key, KeyScope::Public, None).await?;
    adapter.encrypt(descriptor, &crypto_key, data).await
}

/// Decrypt with a caller-held key.
pub async fn decrypt_with_key(
    factory: &CryptoFactory,
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
    data: &[u8],
) -> Result<Vec<u8>> {
    let (adapter, crypto_key) = prepare(factory, descriptor, key, KeyScope::Public, None).await?;
    adapter.decrypt(descriptor, &crypto_key, data).await
}

/// Hash `data` with a `SHA-*` algorithm.
pub async fn digest(factory: &CryptoFactory, algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
    let descriptor = to_descriptor(algorithm, &DescriptorContext::default())?;
    let adapter = factory.get_subtle_crypto_for_algorithm(&descriptor, KeyScope::Public, None)?;
    adapter.digest(&descriptor, data).await
}

/// Generate a random key and give it its RFC 7638 thumbprint as `kid`
/// unless one is already set. Unset sizes come from the factory config,
/// and the key's `use` is set from its family.
pub async fn generate_key(factory: &CryptoFactory, params: &KeyGenParams) -> Result<Jwk> {
    let params = &params.with_defaults(factory.config());
    let kind = CapabilityKind::for_algorithm_name(params.name())?;
    let algorithm = match params {
        KeyGenParams::Ecdsa { .. } => "ES256K",
        KeyGenParams::EdDsa => "EdDSA",
        KeyGenParams::Rsa { algorithm, .. } | KeyGenParams::Secret { algorithm } => {
            algorithm.as_str()
        }
    };
    let adapter = factory.resolve(kind, algorithm, KeyScope::Private, None)?;
    let jwk = adapter.generate_key(params).await?.with_use(params.key_use());
    if jwk.kid().is_some() {
        return Ok(jwk);
    }
    let kid = jwk.thumbprint()?;
    Ok(jwk.with_kid(kid))
}

/// Generate a key and store it as the newest version of `key_reference`.
///
/// Returns the public form; symmetric keys come back as stored.
pub async fn generate_and_store(
    factory: &CryptoFactory,
    params: &KeyGenParams,
    key_reference: &KeyReference,
) -> Result<Jwk> {
    let jwk = generate_key(factory, params).await?;
    factory.key_store().save(key_reference, jwk.clone()).await?;
    log::debug!("Generated {} key for {key_reference}", jwk.kty());
    match jwk {
        Jwk::Oct(_) => Ok(jwk),
        _ => jwk.to_public(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoseError;

    fn es256k() -> KeyGenParams {
        KeyGenParams::Ecdsa {
            named_curve: "secp256k1".into(),
        }
    }

    #[tokio::test]
    async fn test_sign_by_reference_verify_by_public_key() {
        let factory = CryptoFactory::in_memory();
        let reference = KeyReference::key("signer");
        let public = generate_and_store(&factory, &es256k(), &reference)
            .await
            .unwrap();
        assert!(!public.is_private());

        let sig = sign_by_key_reference(&factory, "ES256K", &reference, b"payload")
            .await
            .unwrap();
        assert!(verify_by_public_key(&factory, "ES256K", &public, &sig, b"payload")
            .await
            .unwrap());
        assert!(!verify_by_public_key(&factory, "ES256K", &public, &sig, b"other")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_sign_missing_reference() {
        let factory = CryptoFactory::in_memory();
        let err = sign_by_key_reference(&factory, "ES256K", &KeyReference::key("gone"), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, JoseError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_algorithm() {
        let factory = CryptoFactory::in_memory();
        let key = generate_key(&factory, &es256k()).await.unwrap();
        let err = sign_with_key(&factory, "ES384", &key, b"x").await.unwrap_err();
        assert!(matches!(err, JoseError::UnsupportedAlgorithm(ref a) if a == "ES384"));
    }

    #[tokio::test]
    async fn test_generated_kid_is_thumbprint() {
        let factory = CryptoFactory::in_memory();
        let key = generate_key(&factory, &KeyGenParams::EdDsa).await.unwrap();
        assert_eq!(key.kid().map(str::to_string), Some(key.thumbprint().unwrap()));
    }

    #[tokio::test]
    async fn test_generated_keys_declare_use() {
        let factory = CryptoFactory::in_memory();
        let signing = generate_key(&factory, &es256k()).await.unwrap();
        assert_eq!(signing.key_use(), Some("sig"));
        let content = generate_key(
            &factory,
            &KeyGenParams::Secret {
                algorithm: "A256GCM".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(content.key_use(), Some("enc"));
    }

    fn rsa_modulus_bytes(key: &Jwk) -> usize {
        match key {
            Jwk::RsaPrivate(k) => k.public.n.len(),
            Jwk::RsaPublic(k) => k.n.len(),
            other => panic!("expected an RSA key, got {}", other.kty()),
        }
    }

    #[tokio::test]
    async fn test_rsa_modulus_defaults_to_config() {
        let config = crate::config::JoseConfig {
            default_rsa_modulus_length: 1024,
            ..Default::default()
        };
        let factory = CryptoFactory::with_defaults(
            config,
            Arc::new(crate::store::MemoryKeyStore::new()),
        );
        let params = KeyGenParams::Rsa {
            algorithm: "RSA-OAEP-256".into(),
            modulus_length: None,
        };

        let key = generate_key(&factory, &params).await.unwrap();
        assert_eq!(rsa_modulus_bytes(&key), 128);
        assert_eq!(key.key_use(), Some("enc"));

        let seed = KeyReference::secret("master");
        factory
            .key_store()
            .save(&seed, Jwk::oct(b"masterSeed".to_vec()))
            .await
            .unwrap();
        let pairwise = generate_pairwise_key(&factory, &params, &seed, "persona", "peer")
            .await
            .unwrap();
        assert_eq!(rsa_modulus_bytes(&pairwise), 128);
        let explicit = generate_pairwise_key(
            &factory,
            &KeyGenParams::Rsa {
                algorithm: "RSA-OAEP-256".into(),
                modulus_length: Some(1024),
            },
            &seed,
            "persona",
            "peer",
        )
        .await
        .unwrap();
        assert_eq!(pairwise, explicit);
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_by_reference() {
        let factory = CryptoFactory::in_memory();
        let reference = KeyReference::key("recipient");
        let public = generate_and_store(
            &factory,
            &KeyGenParams::Rsa {
                algorithm: "RSA-OAEP-256".into(),
                modulus_length: Some(1024),
            },
            &reference,
        )
        .await
        .unwrap();
        let wrapped = encrypt_by_public_key(&factory, "RSA-OAEP-256", &public, b"cek")
            .await
            .unwrap();
        let plain = decrypt_by_key_reference(&factory, "RSA-OAEP-256", &reference, &wrapped)
            .await
            .unwrap();
        assert_eq!(plain, b"cek");
    }

    #[tokio::test]
    async fn test_content_encryption_with_key() {
        let factory = CryptoFactory::in_memory();
        let key = generate_key(
            &factory,
            &KeyGenParams::Secret {
                algorithm: "A128GCM".into(),
            },
        )
        .await
        .unwrap();
        let descriptor =
            to_descriptor("A128GCM", &DescriptorContext::aes_gcm(vec![9u8; 12], b"aad".to_vec()))
                .unwrap();
        let sealed = encrypt_with_key(&factory, &descriptor, &key, b"hello")
            .await
            .unwrap();
        assert_eq!(
            decrypt_with_key(&factory, &descriptor, &key, &sealed)
                .await
                .unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn test_digest() {
        let factory = CryptoFactory::in_memory();
        assert_eq!(digest(&factory, "SHA-512", b"").await.unwrap().len(), 64);
        assert!(digest(&factory, "MD5", b"").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_factory_has_no_adapters() {
        let factory = CryptoFactory::new(
            crate::config::JoseConfig::default(),
            Arc::new(crate::store::MemoryKeyStore::new()),
        );
        let err = digest(&factory, "SHA-256", b"").await.err().unwrap();
        assert!(matches!(err, JoseError::NoRegisteredAdapter { .. }));
    }

    #[tokio::test]
    async fn test_pairwise_by_reference() {
        let factory = CryptoFactory::in_memory();
        let seed = KeyReference::secret("master");
        factory
            .key_store()
            .save(&seed, Jwk::oct(b"masterSeed".to_vec()))
            .await
            .unwrap();
        let a = generate_pairwise_key(&factory, &es256k(), &seed, "persona", "peer")
            .await
            .unwrap();
        let b = generate_pairwise_key(&factory, &es256k(), &seed, "persona", "peer")
            .await
            .unwrap();
        assert_eq!(a, b);

        let sig = sign_with_key(&factory, "ES256K", &a, b"hi").await.unwrap();
        assert!(verify_by_public_key(&factory, "ES256K", &a.to_public().unwrap(), &sig, b"hi")
            .await
            .unwrap());
    }
}
