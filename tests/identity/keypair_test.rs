use custody::identity::{Keypair, KeypairError, PublicKey};

/// Test: Each generated keypair should be unique
#[test]
fn test_keypairs_are_unique() {
    let keypair1 = Keypair::generate();
    let keypair2 = Keypair::generate();

    assert_ne!(
        keypair1.public_key(),
        keypair2.public_key(),
        "Two generated keypairs should have different public keys"
    );
}

/// Test: Secret bytes restore the same identity
#[test]
fn test_keypair_serialization() {
    let original = Keypair::generate();

    let restored = Keypair::from_bytes(&original.to_bytes())
        .expect("Should deserialize keypair from bytes");

    assert_eq!(original.public_key(), restored.public_key());
}

/// Test: Public key survives a bytes round trip
#[test]
fn test_public_key_from_bytes() {
    let public_key = Keypair::generate().public_key();

    let restored = PublicKey::from_bytes(public_key.as_bytes())
        .expect("Should deserialize public key from bytes");

    assert_eq!(public_key, restored);
}

/// Test: Wrong-length input is rejected with the lengths involved
#[test]
fn test_invalid_public_key_length() {
    let result = PublicKey::from_bytes(&[7u8; 31]);

    assert!(matches!(
        result,
        Err(KeypairError::InvalidLength { expected: 32, got: 31 })
    ));
}

/// Test: Debug output never includes secret material
#[test]
fn test_keypair_debug_hides_secret() {
    let keypair = Keypair::generate();
    let debug = format!("{:?}", keypair);

    assert!(!debug.contains(&hex::encode(keypair.to_bytes())));
    assert!(debug.contains(&hex::encode(keypair.public_key().as_bytes())));
}
