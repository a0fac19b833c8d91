/// Security tests for the envelope hash
///
/// The hash is the identity of a submission: the ledger deduplicates on it and
/// signatures are made over it. Every field of the body must therefore change
/// the hash, otherwise a relay could alter the field after signing and the
/// altered envelope would still be accepted as the original.
use ed25519_dalek::SigningKey;
use tx_submitter_types::{
    Asset, EnvelopeBuilder, EnvelopeError, EnvelopeSigner, FeeBumpBuilder, Network, Operation,
    TimeBounds, TransactionBody, TransactionEnvelope,
};

fn signer() -> SigningKey {
    SigningKey::from_bytes(&[11u8; 32])
}

fn baseline() -> TransactionBody {
    EnvelopeBuilder::new(signer().account_id(), 100)
        .with_fee(200)
        .with_time_bounds(TimeBounds::between(10, 1_700_000_000))
        .with_memo("invoice-7")
        .add_operation(Operation::Payment {
            destination: "GDEST".to_string(),
            asset: Asset::Native,
            amount: 5_000,
        })
        .build_body()
        .unwrap()
}

fn hash_of(body: &TransactionBody) -> [u8; 32] {
    body.hash_bytes(&Network::testnet()).unwrap()
}

fn assert_field_covered(mutate: impl FnOnce(&mut TransactionBody)) {
    let original = baseline();
    let mut altered = original.clone();
    mutate(&mut altered);
    assert_ne!(
        hash_of(&original),
        hash_of(&altered),
        "field change did not change the hash"
    );
}

#[test]
fn test_source_account_in_hash() {
    assert_field_covered(|b| b.source_account = "GOTHER".to_string());
}

#[test]
fn test_fee_in_hash() {
    assert_field_covered(|b| b.fee += 1);
}

#[test]
fn test_sequence_number_in_hash() {
    assert_field_covered(|b| b.sequence_number += 1);
}

#[test]
fn test_time_bounds_in_hash() {
    assert_field_covered(|b| b.time_bounds = TimeBounds::between(10, 1_700_000_001));
    assert_field_covered(|b| b.time_bounds = TimeBounds::unbounded());
}

#[test]
fn test_memo_in_hash() {
    assert_field_covered(|b| b.memo = None);
}

#[test]
fn test_operation_fields_in_hash() {
    assert_field_covered(|b| {
        b.operations[0] = Operation::Payment {
            destination: "GDEST".to_string(),
            asset: Asset::Native,
            amount: 5_001,
        }
    });
    assert_field_covered(|b| {
        b.operations[0] = Operation::Payment {
            destination: "GDEST".to_string(),
            asset: Asset::Credit {
                code: "USD".to_string(),
                issuer: "GISSUER".to_string(),
            },
            amount: 5_000,
        }
    });
    assert_field_covered(|b| b.operations.push(Operation::BumpSequence { bump_to: 200 }));
}

#[test]
fn test_network_in_hash() {
    let body = baseline();
    assert_ne!(
        body.hash_bytes(&Network::testnet()).unwrap(),
        body.hash_bytes(&Network::public()).unwrap()
    );
    assert_ne!(
        body.hash_bytes(&Network::testnet()).unwrap(),
        body.hash_bytes(&Network::new("Private Ledger ; 2024")).unwrap()
    );
}

#[test]
fn test_tampered_envelope_fails_verification() {
    let network = Network::testnet();
    let key = signer();
    let signed = baseline().sign(&network, &[&key]).unwrap();

    let mut tampered = signed.clone();
    tampered.body.operations[0] = Operation::Payment {
        destination: "GATTACKER".to_string(),
        asset: Asset::Native,
        amount: 5_000,
    };

    let tampered_hash = tampered.body.hash_bytes(&network).unwrap();
    let result = tampered.signatures[0].verify(&key.verifying_key(), &tampered_hash);
    assert!(result.is_err(), "signature must not cover altered body");

    let original_hash = signed.body.hash_bytes(&network).unwrap();
    assert!(signed.signatures[0]
        .verify(&key.verifying_key(), &original_hash)
        .is_ok());
}

#[test]
fn test_signature_bit_flip_invalidates() {
    let network = Network::testnet();
    let key = signer();
    let signed = baseline().sign(&network, &[&key]).unwrap();
    let hash = signed.body.hash_bytes(&network).unwrap();

    let mut flipped = signed.signatures[0].clone();
    let mut bytes = hex::decode(&flipped.signature).unwrap();
    bytes[0] ^= 0x01;
    flipped.signature = hex::encode(bytes);

    assert!(flipped.verify(&key.verifying_key(), &hash).is_err());
}

#[test]
fn test_fee_bump_hash_differs_from_inner() {
    let network = Network::testnet();
    let key = signer();
    let inner = TransactionEnvelope::Transaction(baseline().sign(&network, &[&key]).unwrap());
    let fee_key = SigningKey::from_bytes(&[12u8; 32]);

    let bumped = FeeBumpBuilder::new(fee_key.account_id(), 10_000)
        .wrap(inner.clone(), &network, &fee_key)
        .unwrap();
    assert_ne!(
        bumped.hash(&network).unwrap(),
        inner.hash(&network).unwrap()
    );

    let higher = FeeBumpBuilder::new(fee_key.account_id(), 10_001)
        .wrap(inner, &network, &fee_key)
        .unwrap();
    assert_ne!(
        bumped.hash(&network).unwrap(),
        higher.hash(&network).unwrap()
    );
}

#[test]
fn test_fee_bump_cannot_nest() {
    let network = Network::testnet();
    let key = signer();
    let inner = TransactionEnvelope::Transaction(baseline().sign(&network, &[&key]).unwrap());
    let bumped = FeeBumpBuilder::new(key.account_id(), 10_000)
        .wrap(inner, &network, &key)
        .unwrap();

    let result = FeeBumpBuilder::new(key.account_id(), 20_000).wrap(bumped, &network, &key);
    assert_eq!(result.unwrap_err(), EnvelopeError::NestedFeeBump);
}
