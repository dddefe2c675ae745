// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use bip32::{DerivationPath, Language, Mnemonic, XPrv};
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey};

use crate::error::{ConfigError, StressError};
use crate::types::{Address, Signature, Tx};

/// Cosmos coin type, shared by every TM2 chain
const COIN_TYPE: u32 = 118;

/// A secp256k1 key derived from a mnemonic
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: [u8; 33],
    address: Address,
}

impl KeyPair {
    /// Derives the key at `m/44'/118'/0'/0/{index}` from a BIP-39 mnemonic
    /// with an empty passphrase. The same mnemonic and index always
    /// produce the same key.
    pub fn derive(mnemonic: &str, index: u32) -> Result<Self, StressError> {
        let mnemonic = parse_mnemonic(mnemonic)?;
        Self::derive_from_seed(mnemonic.to_seed("").as_bytes(), index)
    }

    fn derive_from_seed(seed: &[u8], index: u32) -> Result<Self, StressError> {
        let path: DerivationPath = format!("m/44'/{COIN_TYPE}'/0'/0/{index}")
            .parse()
            .map_err(|e| StressError::Signing(format!("invalid derivation path: {e}")))?;
        let xprv = XPrv::derive_from_path(seed, &path)
            .map_err(|e| StressError::Signing(format!("unable to derive key {index}: {e}")))?;

        let public_key = xprv.public_key().to_bytes();
        Ok(Self {
            signing_key: xprv.private_key().clone(),
            address: Address::from_public_key(&public_key),
            public_key,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let signature: EcdsaSignature = self.signing_key.sign(msg);
        signature.as_ref().to_vec()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

pub fn is_valid_mnemonic(phrase: &str) -> bool {
    parse_mnemonic(phrase).is_ok()
}

fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, StressError> {
    Mnemonic::new(phrase.trim(), Language::English)
        .map_err(|_| StressError::Config(ConfigError::InvalidMnemonic))
}

/// Derives `sub_accounts + 1` keys. Index 0 is the funder, the rest are
/// the run participants.
pub fn derive_accounts(mnemonic: &str, sub_accounts: u32) -> Result<Vec<KeyPair>, StressError> {
    let mnemonic = parse_mnemonic(mnemonic)?;
    let seed = mnemonic.to_seed("");

    (0..=sub_accounts)
        .map(|index| KeyPair::derive_from_seed(seed.as_bytes(), index))
        .collect()
}

/// Signing parameters bound into the sign bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignCfg {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

pub trait TxSigner: Send + Sync {
    /// Signs `tx` with `key`, storing the signature in the slot of the
    /// key's address among the transaction signers.
    fn sign_tx(&self, tx: &mut Tx, key: &KeyPair, cfg: &SignCfg) -> Result<(), StressError>;
}

/// Deterministic (RFC 6979) secp256k1 signer over the canonical sign bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Signer;

impl TxSigner for Secp256k1Signer {
    fn sign_tx(&self, tx: &mut Tx, key: &KeyPair, cfg: &SignCfg) -> Result<(), StressError> {
        let signers = tx.signers();
        let slot = signers
            .iter()
            .position(|signer| *signer == key.address())
            .ok_or_else(|| {
                StressError::Signing(format!("{} is not a signer of the transaction", key.address()))
            })?;

        let sign_bytes = tx
            .sign_bytes(&cfg.chain_id, cfg.account_number, cfg.sequence)
            .map_err(|e| StressError::Signing(e.to_string()))?;
        let signature = Signature {
            pub_key: key.public_key().to_vec(),
            signature: key.sign(&sign_bytes),
        };

        match slot.cmp(&tx.signatures.len()) {
            std::cmp::Ordering::Less => tx.signatures[slot] = signature,
            std::cmp::Ordering::Equal => tx.signatures.push(signature),
            std::cmp::Ordering::Greater => {
                return Err(StressError::Signing(format!(
                    "signer {} signed before the signers preceding it",
                    key.address()
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "unit_tests/keys_tests.rs"]
mod keys_tests;
