use agentic_jose::crypto::operations::{generate_and_store, sign_by_key_reference, verify_by_public_key};
use agentic_jose::{
    CryptoFactory, JweEncryptOptions, JweToken, JwsSignOptions, JwsToken, KeyGenParams,
    KeyReference, PairwiseSession, TokenFormat,
};
use criterion::{criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

fn jose_benchmarks(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let factory = CryptoFactory::in_memory();
    let es256k = KeyGenParams::Ecdsa {
        named_curve: "secp256k1".into(),
    };
    let message = b"The quick brown fox jumps over the lazy dog";

    // 1. Raw ES256K signing through the adapter registry
    let signer = KeyReference::key("bench-signer");
    let public = rt
        .block_on(generate_and_store(&factory, &es256k, &signer))
        .unwrap();
    c.bench_function("es256k_sign_by_reference", |b| {
        b.iter(|| rt.block_on(sign_by_key_reference(&factory, "ES256K", &signer, message)));
    });

    // 2. Raw ES256K verification
    let signature = rt
        .block_on(sign_by_key_reference(&factory, "ES256K", &signer, message))
        .unwrap();
    c.bench_function("es256k_verify_by_public_key", |b| {
        b.iter(|| {
            rt.block_on(verify_by_public_key(
                &factory, "ES256K", &public, &signature, message,
            ))
        });
    });

    // 3. Compact JWS sign + serialize
    let unsigned = JwsToken::new(message.to_vec());
    let options = JwsSignOptions::default();
    c.bench_function("jws_compact_sign", |b| {
        b.iter(|| {
            rt.block_on(unsigned.sign(&factory, &signer, TokenFormat::Compact, &options))
                .and_then(|token| token.serialize(TokenFormat::Compact))
        });
    });

    // 4. Compact JWS deserialize + verify
    let compact = rt
        .block_on(unsigned.sign(&factory, &signer, TokenFormat::Compact, &options))
        .unwrap()
        .serialize(TokenFormat::Compact)
        .unwrap();
    let candidates = [public];
    c.bench_function("jws_compact_verify", |b| {
        b.iter(|| {
            let token = JwsToken::deserialize(&compact).unwrap();
            rt.block_on(token.verify(&factory, &candidates, None))
        });
    });

    // 5. JWE encrypt to one RSA-OAEP-256 recipient
    let recipient = KeyReference::key("bench-recipient");
    let rsa = KeyGenParams::Rsa {
        algorithm: "RSA-OAEP-256".into(),
        modulus_length: Some(2048),
    };
    let recipient_pub = rt
        .block_on(generate_and_store(&factory, &rsa, &recipient))
        .unwrap();
    let recipients = [recipient_pub];
    let jwe_options = JweEncryptOptions::default();
    c.bench_function("jwe_rsa_oaep_256_encrypt", |b| {
        b.iter(|| {
            rt.block_on(JweToken::encrypt(
                &factory,
                &recipients,
                message,
                TokenFormat::Compact,
                &jwe_options,
            ))
        });
    });

    // 6. JWE decrypt by key reference
    let sealed = rt
        .block_on(JweToken::encrypt(
            &factory,
            &recipients,
            message,
            TokenFormat::Compact,
            &jwe_options,
        ))
        .unwrap();
    c.bench_function("jwe_rsa_oaep_256_decrypt", |b| {
        b.iter(|| rt.block_on(sealed.decrypt(&factory, &recipient)));
    });

    // 7. Pairwise secp256k1 derivation (fresh session, no master key cache)
    c.bench_function("pairwise_secp256k1_derive", |b| {
        b.iter(|| {
            PairwiseSession::new(b"masterSeed".to_vec()).derive(&es256k, "persona", "did:peer:bench")
        });
    });

    // 8. Pairwise secp256k1 derivation with a warm master key
    let mut session = PairwiseSession::new(b"masterSeed".to_vec());
    let mut counter = 0u64;
    c.bench_function("pairwise_secp256k1_derive_cached_persona", |b| {
        b.iter(|| {
            counter += 1;
            session.derive(&es256k, "persona", &format!("peer-{counter}"))
        });
    });
}

criterion_group!(benches, jose_benchmarks);
criterion_main!(benches);
