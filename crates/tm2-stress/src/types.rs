// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use chrono::{DateTime, Utc};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The native fee denomination of the chain
pub const DENOMINATION: &str = "ugnot";

/// Human readable prefix of bech32 account addresses
pub const ADDRESS_HRP: &str = "g";

pub const ADDRESS_LENGTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid coin `{0}`")]
    Coin(String),

    #[error("invalid address `{0}`: {1}")]
    Address(String, String),
}

/// A single denomination amount, rendered as `<amount><denom>`
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(amount: u64, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// A coin in the native fee denomination
    pub fn native(amount: u64) -> Self {
        Self::new(amount, DENOMINATION)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ParseError::Coin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() || denom.is_empty() {
            return Err(ParseError::Coin(s.to_string()));
        }
        let amount = amount
            .parse::<u64>()
            .map_err(|_| ParseError::Coin(s.to_string()))?;
        Ok(Coin::new(amount, denom))
    }
}

/// A balance across denominations, rendered as a comma separated coin list
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn amount_of(&self, denom: &str) -> u64 {
        self.0
            .iter()
            .filter(|c| c.denom == denom)
            .map(|c| c.amount)
            .sum()
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Self(vec![coin])
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

impl FromStr for Coins {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Coins)
    }
}

/// The price of `gas` gas units, expressed in `price`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPrice {
    pub gas: u64,
    pub price: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub gas_wanted: u64,
    pub gas_fee: Coin,
}

/// Computes the fee for `gas_wanted` units at the given price,
/// rounding up to the next whole coin unit.
pub fn calculate_fee(gas_wanted: u64, price: &GasPrice) -> Fee {
    let unit = u128::from(price.gas.max(1));
    let total = u128::from(gas_wanted) * u128::from(price.price.amount);
    let amount = total.div_ceil(unit);

    Fee {
        gas_wanted,
        gas_fee: Coin::new(
            u64::try_from(amount).unwrap_or(u64::MAX),
            price.price.denom.clone(),
        ),
    }
}

/// An account address, derived from the hash of a public key
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// RIPEMD-160(SHA-256(compressed public key))
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let sha = Sha256::digest(public_key);
        let hash = Ripemd160::digest(sha);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode(ADDRESS_HRP, self.0.to_base32(), Variant::Bech32)
            .map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ParseError::Address(s.to_string(), reason);
        let (hrp, data, _) = bech32::decode(s).map_err(|e| invalid(e.to_string()))?;
        if hrp != ADDRESS_HRP {
            return Err(invalid(format!("unexpected prefix {hrp}")));
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))?;
        let bytes: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 20 bytes, got {}", b.len())))?;
        Ok(Self(bytes))
    }
}

/// On-chain account state. The account number and sequence are zero
/// until the account first appears on-chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
    pub coins: Coins,
}

impl Account {
    pub fn balance(&self) -> u64 {
        self.coins.amount_of(DENOMINATION)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemFile {
    pub name: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemPackage {
    pub name: String,
    pub path: String,
    pub files: Vec<MemFile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAddPackage {
    pub creator: Address,
    pub package: MemPackage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCall {
    pub caller: Address,
    pub pkg_path: String,
    pub func: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: Address,
    pub to_address: Address,
    pub amount: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    AddPackage(MsgAddPackage),
    Call(MsgCall),
    Send(MsgSend),
}

impl Msg {
    pub fn signer(&self) -> Address {
        match self {
            Msg::AddPackage(msg) => msg.creator,
            Msg::Call(msg) => msg.caller,
            Msg::Send(msg) => msg.from_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub pub_key: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Hash of the wire bytes of a transaction
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub Vec<u8>);

impl TxHash {
    pub fn of(raw_tx: &[u8]) -> Self {
        Self(Sha256::digest(raw_tx).to_vec())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

#[derive(Serialize)]
struct SignDoc<'a> {
    chain_id: &'a str,
    account_number: u64,
    sequence: u64,
    fee: &'a Fee,
    msgs: &'a [Msg],
    memo: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub msgs: Vec<Msg>,
    pub fee: Fee,
    pub signatures: Vec<Signature>,
    pub memo: String,
}

impl Tx {
    pub fn new(msgs: Vec<Msg>, fee: Fee) -> Self {
        Self {
            msgs,
            fee,
            signatures: vec![],
            memo: String::new(),
        }
    }

    /// Replaces the fee. Existing signatures cover the old fee,
    /// so they are dropped and the transaction must be signed again.
    pub fn set_fee(&mut self, fee: Fee) {
        self.fee = fee;
        self.signatures.clear();
    }

    /// Distinct signers, in message order
    pub fn signers(&self) -> Vec<Address> {
        let mut seen = BTreeSet::new();
        self.msgs
            .iter()
            .map(Msg::signer)
            .filter(|signer| seen.insert(*signer))
            .collect()
    }

    pub fn sign_bytes(
        &self,
        chain_id: &str,
        account_number: u64,
        sequence: u64,
    ) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SignDoc {
            chain_id,
            account_number,
            sequence,
            fee: &self.fee,
            msgs: &self.msgs,
            memo: &self.memo,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }

    pub fn hash(&self) -> Result<TxHash, bcs::Error> {
        Ok(TxHash::of(&self.to_bytes()?))
    }
}

/// A committed block, as seen by the collector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub num_txs: u64,
    pub txs: Vec<Vec<u8>>,
}

#[cfg(test)]
#[path = "unit_tests/types_tests.rs"]
mod types_tests;
