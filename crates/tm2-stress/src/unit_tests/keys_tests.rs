// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};

use super::*;
use crate::test_utils::{test_gas_price, TEST_CHAIN_ID, TEST_MNEMONIC};
use crate::types::{calculate_fee, Coin, Coins, Msg, MsgSend};

fn transfer(from: Address, to: Address) -> Tx {
    Tx::new(
        vec![Msg::Send(MsgSend {
            from_address: from,
            to_address: to,
            amount: Coins::from(Coin::native(1)),
        })],
        calculate_fee(100_000, &test_gas_price()),
    )
}

fn cfg(sequence: u64) -> SignCfg {
    SignCfg {
        chain_id: TEST_CHAIN_ID.to_string(),
        account_number: 7,
        sequence,
    }
}

#[test]
fn derivation_is_deterministic() {
    let first = KeyPair::derive(TEST_MNEMONIC, 0).unwrap();
    let again = KeyPair::derive(TEST_MNEMONIC, 0).unwrap();
    let other = KeyPair::derive(TEST_MNEMONIC, 1).unwrap();

    assert_eq!(first.address(), again.address());
    assert_eq!(first.public_key(), again.public_key());
    assert_ne!(first.address(), other.address());
    assert!(first.address().to_string().starts_with("g1"));
    assert_eq!(
        first.address(),
        Address::from_public_key(first.public_key())
    );
}

#[test]
fn derive_accounts_includes_the_funder() {
    let keys = derive_accounts(TEST_MNEMONIC, 3).unwrap();
    assert_eq!(keys.len(), 4);

    for (index, key) in keys.iter().enumerate() {
        let expected = KeyPair::derive(TEST_MNEMONIC, index as u32).unwrap();
        assert_eq!(key.address(), expected.address());
    }
}

#[test]
fn invalid_mnemonics_are_rejected() {
    for phrase in ["", "not a mnemonic", "abandon abandon abandon"] {
        assert!(!is_valid_mnemonic(phrase));
        assert!(matches!(
            derive_accounts(phrase, 1),
            Err(StressError::Config(ConfigError::InvalidMnemonic))
        ));
    }
    assert!(is_valid_mnemonic(TEST_MNEMONIC));
}

#[test]
fn signature_verifies_against_sign_bytes() {
    let key = KeyPair::derive(TEST_MNEMONIC, 0).unwrap();
    let mut tx = transfer(key.address(), Address::new([9; 20]));

    Secp256k1Signer.sign_tx(&mut tx, &key, &cfg(3)).unwrap();
    assert_eq!(tx.signatures.len(), 1);

    let signature = &tx.signatures[0];
    assert_eq!(signature.pub_key, key.public_key().to_vec());
    assert_eq!(signature.signature.len(), 64);

    let verifying_key = VerifyingKey::from_sec1_bytes(&signature.pub_key).unwrap();
    let ecdsa = EcdsaSignature::try_from(signature.signature.as_slice()).unwrap();
    let sign_bytes = tx.sign_bytes(TEST_CHAIN_ID, 7, 3).unwrap();
    assert!(verifying_key.verify(&sign_bytes, &ecdsa).is_ok());

    // a different sequence yields different sign bytes
    let other = tx.sign_bytes(TEST_CHAIN_ID, 7, 4).unwrap();
    assert!(verifying_key.verify(&other, &ecdsa).is_err());
}

#[test]
fn signing_again_replaces_the_signature() {
    let key = KeyPair::derive(TEST_MNEMONIC, 0).unwrap();
    let mut tx = transfer(key.address(), Address::new([9; 20]));

    Secp256k1Signer.sign_tx(&mut tx, &key, &cfg(0)).unwrap();
    let first = tx.signatures[0].clone();
    Secp256k1Signer.sign_tx(&mut tx, &key, &cfg(1)).unwrap();

    assert_eq!(tx.signatures.len(), 1);
    assert_ne!(tx.signatures[0], first);
}

#[test]
fn non_signers_cannot_sign() {
    let keys = derive_accounts(TEST_MNEMONIC, 1).unwrap();
    let mut tx = transfer(keys[0].address(), keys[1].address());

    let err = Secp256k1Signer
        .sign_tx(&mut tx, &keys[1], &cfg(0))
        .unwrap_err();
    assert!(matches!(err, StressError::Signing(_)));
    assert!(tx.signatures.is_empty());
}

#[test]
fn signers_sign_in_order() {
    let keys = derive_accounts(TEST_MNEMONIC, 1).unwrap();
    let (a, b) = (keys[0].address(), keys[1].address());
    let mut tx = transfer(a, b);
    tx.msgs.extend(transfer(b, a).msgs);

    assert!(matches!(
        Secp256k1Signer.sign_tx(&mut tx, &keys[1], &cfg(0)),
        Err(StressError::Signing(_))
    ));

    Secp256k1Signer.sign_tx(&mut tx, &keys[0], &cfg(0)).unwrap();
    assert_eq!(tx.signatures.len(), 1);
    Secp256k1Signer.sign_tx(&mut tx, &keys[1], &cfg(0)).unwrap();
    assert_eq!(tx.signatures.len(), tx.signers().len());
}
