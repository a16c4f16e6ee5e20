//! Integration test: encrypted token workflow.
//!
//! Tests the complete lifecycle:
//! 1. Generate RSA key-encryption keys into a file-backed key store
//! 2. Encrypt a payload to one or more recipients
//! 3. Serialize, deserialize and decrypt by key reference
//! 4. Confirm outsiders and tampering are rejected

use std::sync::Arc;

use agentic_jose::crypto::operations::generate_and_store;
use agentic_jose::encoding::{b64url_decode, b64url_encode};
use agentic_jose::{
    CryptoFactory, FileKeyStore, Header, JoseConfig, JoseError, Jwk, JweEncryptOptions, JweToken,
    KeyGenParams, KeyReference, TokenFormat,
};
use tempfile::TempDir;

fn rsa(algorithm: &str) -> KeyGenParams {
    KeyGenParams::Rsa {
        algorithm: algorithm.into(),
        modulus_length: Some(2048),
    }
}

async fn file_factory(dir: &TempDir) -> CryptoFactory {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = FileKeyStore::new(dir.path())
        .await
        .expect("file key store should open");
    CryptoFactory::with_defaults(JoseConfig::default(), Arc::new(store))
}

async fn recipient(factory: &CryptoFactory, name: &str, algorithm: &str) -> (KeyReference, Jwk) {
    let reference = KeyReference::key(name);
    let public = generate_and_store(factory, &rsa(algorithm), &reference)
        .await
        .expect("key generation should succeed");
    (reference, public)
}

#[tokio::test]
async fn rsa_oaep_round_trip_through_every_format() {
    let dir = TempDir::new().unwrap();
    let factory = file_factory(&dir).await;
    let (reference, public) = recipient(&factory, "houston", "RSA-OAEP").await;

    for format in [
        TokenFormat::Compact,
        TokenFormat::FlatJson,
        TokenFormat::GeneralJson,
    ] {
        // ── Encrypt ─────────────────────────────────────────────────────
        let token = JweToken::encrypt(
            &factory,
            &[public.clone()],
            b"hello houston",
            format,
            &JweEncryptOptions::default(),
        )
        .await
        .expect("encryption should succeed");
        assert_eq!(token.protected().header().alg(), Some("RSA-OAEP"));
        assert_eq!(token.protected().header().enc(), Some("A256GCM"));
        assert_eq!(token.tag().len(), 16);

        // ── Serialize and read back ─────────────────────────────────────
        let text = token.serialize(format).expect("serialize should succeed");
        if format == TokenFormat::Compact {
            assert_eq!(text.split('.').count(), 5);
        }
        let parsed = JweToken::deserialize(&text).expect("deserialize should succeed");
        assert_eq!(parsed, token, "{format} round trip changed the token");

        // ── Decrypt ─────────────────────────────────────────────────────
        let plaintext = parsed
            .decrypt(&factory, &reference)
            .await
            .expect("decryption should succeed");
        assert_eq!(plaintext, b"hello houston");
    }
}

#[tokio::test]
async fn rsa_oaep_256_and_custom_content_encryption() {
    let dir = TempDir::new().unwrap();
    let factory = file_factory(&dir).await;
    let (reference, public) = recipient(&factory, "houston", "RSA-OAEP-256").await;

    let options = JweEncryptOptions {
        content_encryption: Some("A128GCM".into()),
        protected: Header::new().with("typ", "JWE"),
        ..Default::default()
    };
    let compact = JweToken::encrypt(
        &factory,
        &[public],
        b"hello houston",
        TokenFormat::Compact,
        &options,
    )
    .await
    .unwrap()
    .serialize(TokenFormat::Compact)
    .unwrap();

    let parsed = JweToken::deserialize(&compact).unwrap();
    let header = parsed.protected().header();
    assert_eq!(header.alg(), Some("RSA-OAEP-256"));
    assert_eq!(header.enc(), Some("A128GCM"));
    assert_eq!(header.get_str("typ"), Some("JWE"));
    assert_eq!(
        parsed.decrypt(&factory, &reference).await.unwrap(),
        b"hello houston"
    );
}

#[tokio::test]
async fn keys_survive_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let token = {
        let factory = file_factory(&dir).await;
        let (_, public) = recipient(&factory, "durable", "RSA-OAEP").await;
        JweToken::encrypt(
            &factory,
            &[public],
            b"kept on disk",
            TokenFormat::FlatJson,
            &JweEncryptOptions::default(),
        )
        .await
        .unwrap()
        .serialize(TokenFormat::FlatJson)
        .unwrap()
    };

    let reopened = file_factory(&dir).await;
    let parsed = JweToken::deserialize(&token).unwrap();
    assert_eq!(
        parsed
            .decrypt(&reopened, &KeyReference::key("durable"))
            .await
            .unwrap(),
        b"kept on disk"
    );
}

#[tokio::test]
async fn general_json_with_unprotected_header_and_aad() {
    let dir = TempDir::new().unwrap();
    let factory = file_factory(&dir).await;
    let (alice, alice_pub) = recipient(&factory, "alice", "RSA-OAEP").await;
    let (bob, bob_pub) = recipient(&factory, "bob", "RSA-OAEP-256").await;

    let options = JweEncryptOptions {
        unprotected: Header::new().with("jku", "https://example.com/keys"),
        aad: Some(b"routing-context".to_vec()),
        ..Default::default()
    };
    let general = JweToken::encrypt(
        &factory,
        &[alice_pub, bob_pub],
        b"for both of you",
        TokenFormat::GeneralJson,
        &options,
    )
    .await
    .unwrap()
    .serialize(TokenFormat::GeneralJson)
    .unwrap();

    let json: serde_json::Value = serde_json::from_str(&general).unwrap();
    assert_eq!(json["recipients"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["unprotected"]["jku"], "https://example.com/keys");
    assert!(json["aad"].is_string());

    let parsed = JweToken::deserialize(&general).unwrap();
    assert_eq!(parsed.aad(), b"routing-context");
    for reference in [&alice, &bob] {
        assert_eq!(
            parsed.decrypt(&factory, reference).await.unwrap(),
            b"for both of you",
            "{reference} should decrypt"
        );
    }
}

#[tokio::test]
async fn outsider_and_tampering_are_rejected() {
    let dir = TempDir::new().unwrap();
    let factory = file_factory(&dir).await;
    let (_, public) = recipient(&factory, "houston", "RSA-OAEP").await;
    let (outsider, _) = recipient(&factory, "outsider", "RSA-OAEP").await;

    let compact = JweToken::encrypt(
        &factory,
        &[public],
        b"hello houston",
        TokenFormat::Compact,
        &JweEncryptOptions::default(),
    )
    .await
    .unwrap()
    .serialize(TokenFormat::Compact)
    .unwrap();
    let parsed = JweToken::deserialize(&compact).unwrap();
    assert!(matches!(
        parsed.decrypt(&factory, &outsider).await,
        Err(JoseError::ContentKeyUnrecoverable)
    ));

    // Flip one ciphertext bit so the tag no longer matches.
    let mut parts: Vec<String> = compact.split('.').map(str::to_string).collect();
    let mut ciphertext = b64url_decode(&parts[3], "ciphertext").unwrap();
    ciphertext[0] ^= 0x01;
    parts[3] = b64url_encode(&ciphertext);
    let tampered = JweToken::deserialize(&parts.join(".")).unwrap();
    assert!(tampered
        .decrypt(&factory, &KeyReference::key("houston"))
        .await
        .is_err());
}

#[test]
fn truncated_compact_token_names_missing_field() {
    let err = JweToken::deserialize("eyJhbGciOiJSU0EtT0FFUCJ9..AAAA.AAAA.AAAA").unwrap_err();
    assert!(
        matches!(err, JoseError::MalformedToken(ref field) if field.starts_with("encrypted_key")),
        "got {err:?}"
    );
}
