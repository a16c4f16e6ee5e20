//! Stress test: pairwise key derivation at scale.
//!
//! Validates that every (persona, peer) relationship gets its own key,
//! that derivation is reproducible, and that derived RSA keys have the
//! requested modulus size.

use std::collections::HashSet;

use agentic_jose::crypto::operations::generate_pairwise_key;
use agentic_jose::encoding::b64url_encode;
use agentic_jose::{CryptoFactory, JoseError, Jwk, KeyGenParams, KeyReference, PairwiseSession};

const SEED: &[u8] = b"masterSeed";

fn es256k() -> KeyGenParams {
    KeyGenParams::Ecdsa {
        named_curve: "secp256k1".into(),
    }
}

fn ec_d(jwk: &Jwk) -> Vec<u8> {
    match jwk {
        Jwk::EcPrivate(private) => private.d.clone(),
        other => panic!("expected a private EC key, got {:?}", other.kty()),
    }
}

#[test]
fn stress_100_personas_distinct_master_keys() {
    let mut session = PairwiseSession::new(SEED.to_vec());
    let mut seen = HashSet::new();
    for i in 0..100 {
        let master = session
            .persona_master_key(&format!("persona-{i}"))
            .expect("master key derivation should succeed")
            .to_vec();
        assert_eq!(master.len(), 64);
        assert!(seen.insert(master), "persona-{i} collided");
    }

    assert_eq!(
        b64url_encode(session.persona_master_key("persona").unwrap()),
        "lQSZ5aEfZZzetEYB1fEBKJpFI3QLzfQYnvKnbirIHbk65Z7lzna7voxw9RpR_liwQK-IoeGpVmZ0NRjBC3SSFg"
    );
}

#[test]
fn stress_100_peers_distinct_secp256k1_keys() {
    let mut session = PairwiseSession::new(SEED.to_vec());
    let mut seen = HashSet::new();
    for i in 0..100 {
        let jwk = session
            .derive(&es256k(), "persona", &format!("did:peer:{i}"))
            .expect("derivation should succeed");
        assert_eq!(jwk.alg(), Some("ES256K"));
        assert!(seen.insert(ec_d(&jwk)), "peer {i} collided");
    }
}

#[test]
fn stress_persona_peer_grid_is_reproducible() {
    let mut first = PairwiseSession::new(SEED.to_vec());
    let mut second = PairwiseSession::new(SEED.to_vec());
    let mut seen = HashSet::new();

    for persona in 0..10 {
        for peer in 0..10 {
            let persona = format!("persona-{persona}");
            let peer = format!("peer-{peer}");
            let a = first.derive(&es256k(), &persona, &peer).unwrap();
            let b = second.derive(&es256k(), &persona, &peer).unwrap();
            assert_eq!(a, b, "{persona}/{peer} not reproducible");
            assert!(seen.insert(ec_d(&a)), "{persona}/{peer} collided");
        }
    }
    assert_eq!(seen.len(), 100);
}

#[test]
fn stress_different_seeds_diverge() {
    let mut left = PairwiseSession::new(b"seed-one".to_vec());
    let mut right = PairwiseSession::new(b"seed-two".to_vec());
    for i in 0..50 {
        let peer = format!("peer-{i}");
        assert_ne!(
            left.derive(&es256k(), "persona", &peer).unwrap(),
            right.derive(&es256k(), "persona", &peer).unwrap()
        );
    }
}

#[tokio::test]
async fn stress_rsa_pairwise_keys() {
    let factory = CryptoFactory::in_memory();
    let seed = KeyReference::secret("seed");
    factory
        .key_store()
        .save(&seed, Jwk::oct(SEED.to_vec()))
        .await
        .unwrap();

    let rsa_1024 = KeyGenParams::Rsa {
        algorithm: "RS256".into(),
        modulus_length: Some(1024),
    };
    let mut moduli = HashSet::new();
    for i in 0..5 {
        let jwk = generate_pairwise_key(&factory, &rsa_1024, &seed, "persona", &format!("peer-{i}"))
            .await
            .expect("RSA derivation should succeed");
        let Jwk::RsaPrivate(private) = &jwk else {
            panic!("expected a private RSA key");
        };
        assert_eq!(private.public.n.len(), 128);
        assert_eq!(private.public.e, [0x01, 0x00, 0x01]);
        assert!(moduli.insert(private.public.n.clone()), "peer-{i} collided");
    }

    let rsa_2048 = KeyGenParams::Rsa {
        algorithm: "RSA-OAEP-256".into(),
        modulus_length: Some(2048),
    };
    let first = generate_pairwise_key(&factory, &rsa_2048, &seed, "persona", "peer")
        .await
        .unwrap();
    let second = generate_pairwise_key(&factory, &rsa_2048, &seed, "persona", "peer")
        .await
        .unwrap();
    assert_eq!(first, second);
    let Jwk::RsaPrivate(private) = &first else {
        panic!("expected a private RSA key");
    };
    assert_eq!(private.public.n.len(), 256);
    assert_eq!(first.alg(), Some("RSA-OAEP-256"));
}

#[tokio::test]
async fn stress_unsupported_targets_fail_fast() {
    let factory = CryptoFactory::in_memory();
    let seed = KeyReference::secret("seed");
    factory
        .key_store()
        .save(&seed, Jwk::oct(SEED.to_vec()))
        .await
        .unwrap();

    for _ in 0..100 {
        assert!(matches!(
            generate_pairwise_key(&factory, &KeyGenParams::EdDsa, &seed, "p", "q").await,
            Err(JoseError::UnsupportedPairwiseKeyType(_))
        ));
    }
}
