//! Stress test: tokens with many signers and many recipients.
//!
//! Validates that entry order survives serialization and that every party
//! can verify or decrypt independently.

use agentic_jose::crypto::operations::generate_and_store;
use agentic_jose::{
    CryptoFactory, Jwk, JweEncryptOptions, JweToken, JwsSignOptions, JwsToken, KeyGenParams,
    KeyReference, TokenFormat,
};

async fn ec_signers(factory: &CryptoFactory, count: usize) -> Vec<(KeyReference, Jwk)> {
    let params = KeyGenParams::Ecdsa {
        named_curve: "secp256k1".into(),
    };
    let mut signers = Vec::with_capacity(count);
    for i in 0..count {
        let reference = KeyReference::key(format!("signer-{i}"));
        let public = generate_and_store(factory, &params, &reference)
            .await
            .expect("key generation should succeed");
        signers.push((reference, public));
    }
    signers
}

#[tokio::test]
async fn stress_50_signers_general_json() {
    let factory = CryptoFactory::in_memory();
    let signers = ec_signers(&factory, 50).await;

    let mut token = JwsToken::new(b"quorum decision".to_vec());
    for (reference, _) in &signers {
        token = token
            .sign(&factory, reference, TokenFormat::GeneralJson, &JwsSignOptions::default())
            .await
            .expect("signing should succeed");
    }
    assert_eq!(token.signatures().len(), 50);

    let general = token.serialize(TokenFormat::GeneralJson).unwrap();
    let parsed = JwsToken::deserialize(&general).unwrap();
    assert_eq!(parsed, token);

    // Signature order follows signing order.
    for (entry, (_, public)) in parsed.signatures().iter().zip(&signers) {
        assert_eq!(entry.kid(), public.kid());
    }

    let candidates: Vec<Jwk> = signers.iter().map(|(_, public)| public.clone()).collect();
    assert!(parsed.verify(&factory, &candidates, None).await.unwrap());
    assert!(
        !parsed
            .verify(&factory, &candidates[..49], None)
            .await
            .unwrap(),
        "the last signature has no candidate"
    );
}

#[tokio::test]
async fn stress_mixed_algorithm_signers() {
    let factory = CryptoFactory::in_memory();
    let params = [
        KeyGenParams::Ecdsa {
            named_curve: "secp256k1".into(),
        },
        KeyGenParams::EdDsa,
        KeyGenParams::Secret {
            algorithm: "HS512".into(),
        },
    ];

    let mut token = JwsToken::new(b"mixed".to_vec());
    let mut candidates = Vec::new();
    for round in 0..10 {
        for (i, p) in params.iter().enumerate() {
            let reference = match p {
                KeyGenParams::Secret { .. } => KeyReference::secret(format!("mac-{round}")),
                _ => KeyReference::key(format!("signer-{round}-{i}")),
            };
            candidates.push(generate_and_store(&factory, p, &reference).await.unwrap());
            token = token
                .sign(&factory, &reference, TokenFormat::GeneralJson, &JwsSignOptions::default())
                .await
                .unwrap();
        }
    }
    assert_eq!(token.signatures().len(), 30);

    let algorithms: Vec<&str> = token
        .signatures()
        .iter()
        .filter_map(|s| s.algorithm())
        .take(3)
        .collect();
    assert_eq!(algorithms, ["ES256K", "EdDSA", "HS512"]);

    let parsed = JwsToken::deserialize(&token.serialize(TokenFormat::GeneralJson).unwrap()).unwrap();
    assert!(parsed.verify(&factory, &candidates, None).await.unwrap());
}

#[tokio::test]
async fn stress_20_recipients_each_decrypt() {
    let factory = CryptoFactory::in_memory();
    let params = KeyGenParams::Rsa {
        algorithm: "RSA-OAEP-256".into(),
        modulus_length: Some(1024),
    };
    let mut references = Vec::new();
    let mut publics = Vec::new();
    for i in 0..20 {
        let reference = KeyReference::key(format!("recipient-{i}"));
        publics.push(generate_and_store(&factory, &params, &reference).await.unwrap());
        references.push(reference);
    }

    let general = JweToken::encrypt(
        &factory,
        &publics,
        b"broadcast",
        TokenFormat::GeneralJson,
        &JweEncryptOptions::default(),
    )
    .await
    .expect("encryption should succeed")
    .serialize(TokenFormat::GeneralJson)
    .unwrap();

    let parsed = JweToken::deserialize(&general).unwrap();
    assert_eq!(parsed.recipients().len(), 20);
    for (recipient, public) in parsed.recipients().iter().zip(&publics) {
        assert_eq!(recipient.header().kid(), public.kid());
        assert_eq!(recipient.header().alg(), Some("RSA-OAEP-256"));
    }
    for (i, reference) in references.iter().enumerate() {
        assert_eq!(
            parsed.decrypt(&factory, reference).await.unwrap(),
            b"broadcast",
            "recipient {i} failed to decrypt"
        );
    }
}

#[tokio::test]
async fn stress_concurrent_signing_shares_factory() {
    let factory = std::sync::Arc::new(CryptoFactory::in_memory());
    let signers = ec_signers(&factory, 16).await;

    let mut handles = Vec::new();
    for (reference, public) in signers {
        let factory = factory.clone();
        handles.push(tokio::spawn(async move {
            let token = JwsToken::new(format!("from {reference}").into_bytes())
                .sign(&factory, &reference, TokenFormat::Compact, &JwsSignOptions::default())
                .await
                .unwrap();
            token.verify(&factory, &[public], None).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }
}
