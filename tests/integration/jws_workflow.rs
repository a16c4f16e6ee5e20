//! Integration test: signed token workflow.
//!
//! Tests the complete lifecycle:
//! 1. Generate and store signing keys
//! 2. Sign a payload in each serialization
//! 3. Serialize, deserialize and compare
//! 4. Verify against candidate public keys
//! 5. Sign with a pairwise key derived from a stored seed

use agentic_jose::crypto::operations::{generate_and_store, generate_pairwise_key};
use agentic_jose::jose::JwsSignature;
use agentic_jose::{
    CryptoFactory, Header, JoseError, Jwk, JwsSignOptions, JwsToken, KeyGenParams, KeyReference,
    TokenFormat,
};

fn es256k() -> KeyGenParams {
    KeyGenParams::Ecdsa {
        named_curve: "secp256k1".into(),
    }
}

async fn signer(factory: &CryptoFactory, name: &str) -> (KeyReference, Jwk) {
    let _ = env_logger::builder().is_test(true).try_init();
    let reference = KeyReference::key(name);
    let public = generate_and_store(factory, &es256k(), &reference)
        .await
        .expect("key generation should succeed");
    (reference, public)
}

fn same_entry(left: &JwsSignature, right: &JwsSignature) -> bool {
    left.protected().encoded() == right.protected().encoded()
        && left.signature() == right.signature()
}

#[tokio::test]
async fn general_json_sign_serialize_deserialize_verify() {
    let factory = CryptoFactory::in_memory();
    let (reference, public) = signer(&factory, "issuer").await;

    // ── Sign ────────────────────────────────────────────────────────────
    let token = JwsToken::new(b"test payload".to_vec())
        .sign(
            &factory,
            &reference,
            TokenFormat::GeneralJson,
            &JwsSignOptions::default(),
        )
        .await
        .expect("signing should succeed");
    assert_eq!(token.signatures().len(), 1);
    assert_eq!(token.signatures()[0].algorithm(), Some("ES256K"));

    // ── Serialize and read back ─────────────────────────────────────────
    let serialized = token
        .serialize(TokenFormat::GeneralJson)
        .expect("serialize should succeed");
    let json: serde_json::Value = serde_json::from_str(&serialized).unwrap();
    assert!(json["signatures"].is_array(), "general JSON needs signatures[]");

    let parsed = JwsToken::deserialize(&serialized).expect("deserialize should succeed");
    assert_eq!(parsed.payload(), b"test payload");
    assert!(
        same_entry(&parsed.signatures()[0], &token.signatures()[0]),
        "protected header and signature must survive the round trip"
    );

    // ── Verify ──────────────────────────────────────────────────────────
    assert!(
        parsed.verify(&factory, &[public], None).await.unwrap(),
        "issuer's public key should verify"
    );
}

#[tokio::test]
async fn every_format_verifies_after_round_trip() {
    let factory = CryptoFactory::in_memory();
    let (reference, public) = signer(&factory, "issuer").await;

    for format in [
        TokenFormat::Compact,
        TokenFormat::FlatJson,
        TokenFormat::GeneralJson,
    ] {
        let token = JwsToken::new(br#"{"iss":"did:example:123"}"#.to_vec())
            .sign(&factory, &reference, format, &JwsSignOptions::default())
            .await
            .unwrap();
        let text = token.serialize(format).unwrap();
        let parsed = JwsToken::deserialize(&text).unwrap();
        assert_eq!(parsed, token, "{format} round trip changed the token");
        assert!(
            parsed.verify(&factory, &[public.clone()], None).await.unwrap(),
            "{format} token should verify"
        );
    }
}

#[tokio::test]
async fn protected_member_order_is_signed_as_written() {
    let factory = CryptoFactory::in_memory();
    let (reference, public) = signer(&factory, "issuer").await;
    let options = JwsSignOptions {
        protected: Header::new().with("typ", "JWT").with("cty", "json"),
        header: Header::new(),
    };
    let token = JwsToken::new(b"ordered".to_vec())
        .sign(&factory, &reference, TokenFormat::Compact, &options)
        .await
        .unwrap();

    let names: Vec<&String> = token.signatures()[0]
        .protected()
        .header()
        .iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["alg", "kid", "typ", "cty"]);

    let compact = token.serialize(TokenFormat::Compact).unwrap();
    let parsed = JwsToken::deserialize(&compact).unwrap();
    assert_eq!(
        parsed.signatures()[0].protected().encoded(),
        compact.split('.').next().unwrap()
    );
    assert!(parsed.verify(&factory, &[public], None).await.unwrap());
}

#[tokio::test]
async fn tampered_payload_fails_verification() {
    let factory = CryptoFactory::in_memory();
    let (reference, public) = signer(&factory, "issuer").await;
    let compact = JwsToken::new(b"amount=10".to_vec())
        .sign(&factory, &reference, TokenFormat::Compact, &JwsSignOptions::default())
        .await
        .unwrap()
        .serialize(TokenFormat::Compact)
        .unwrap();

    let parts: Vec<&str> = compact.split('.').collect();
    let forged = format!(
        "{}.{}.{}",
        parts[0],
        agentic_jose::encoding::b64url_encode(b"amount=99"),
        parts[2]
    );
    let parsed = JwsToken::deserialize(&forged).unwrap();
    assert!(
        !parsed.verify(&factory, &[public], None).await.unwrap(),
        "a forged payload must not verify"
    );
}

#[tokio::test]
async fn pairwise_key_signs_and_verifies() {
    let factory = CryptoFactory::in_memory();
    let seed = KeyReference::secret("master-seed");
    factory
        .key_store()
        .save(&seed, Jwk::oct(b"masterSeed".to_vec()))
        .await
        .unwrap();

    let pairwise = generate_pairwise_key(&factory, &es256k(), &seed, "persona", "did:peer:bob")
        .await
        .expect("pairwise derivation should succeed");
    let again = generate_pairwise_key(&factory, &es256k(), &seed, "persona", "did:peer:bob")
        .await
        .unwrap();
    assert_eq!(pairwise, again, "pairwise keys must be reproducible");

    let reference = KeyReference::key("pairwise-bob");
    factory
        .key_store()
        .save(&reference, pairwise.clone())
        .await
        .unwrap();
    let token = JwsToken::new(b"hello bob".to_vec())
        .sign(&factory, &reference, TokenFormat::Compact, &JwsSignOptions::default())
        .await
        .unwrap();
    assert!(token
        .verify(&factory, &[pairwise.to_public().unwrap()], None)
        .await
        .unwrap());
}

#[test]
fn unknown_format_is_rejected_by_name() {
    let err = "bluesky".parse::<TokenFormat>().unwrap_err();
    assert!(
        matches!(err, JoseError::UnsupportedFormat(ref name) if name == "bluesky"),
        "error should name the format, got {err:?}"
    );
}

#[test]
fn garbage_input_does_not_deserialize() {
    assert!(JwsToken::deserialize("not a token").is_err());
    assert!(JwsToken::deserialize("a.b").is_err());
    assert!(JwsToken::deserialize("{}").is_err());
}
