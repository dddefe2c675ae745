// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire shapes of the Tendermint2 JSON-RPC responses used by the node client.
//! Integers travel as decimal strings and byte fields as base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::types::{Account, Address, Coin, Coins, GasPrice};

use super::ClientError;

pub(crate) fn decode_base64(what: &'static str, data: &str) -> Result<Vec<u8>, ClientError> {
    STANDARD
        .decode(data)
        .map_err(|e| ClientError::decode(what, e))
}

pub(crate) fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct SyncInfo {
    #[serde_as(as = "DisplayFromStr")]
    pub latest_block_height: u64,
}

#[derive(Debug, Deserialize)]
pub struct ResultStatus {
    pub sync_info: SyncInfo,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct Header {
    #[serde_as(as = "DisplayFromStr")]
    pub height: u64,
    pub time: DateTime<Utc>,
    #[serde_as(as = "DisplayFromStr")]
    pub num_txs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockData {
    #[serde(default)]
    pub txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    pub header: Header,
    #[serde(default)]
    pub data: BlockData,
}

#[derive(Debug, Deserialize)]
pub struct ResultBlock {
    pub block: BlockBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseBase {
    #[serde(rename = "Error", default)]
    pub error: Option<serde_json::Value>,
    #[serde(rename = "Data", default)]
    pub data: Option<String>,
    #[serde(rename = "Log", default)]
    pub log: String,
}

impl ResponseBase {
    /// The error carried by the response, if any, described by its log
    /// when the node provided one.
    pub fn failure(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(error) if self.log.is_empty() => Some(error.to_string()),
            Some(_) => Some(self.log.clone()),
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ResponseDeliverTx {
    #[serde(rename = "ResponseBase", default)]
    pub base: ResponseBase,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "GasUsed", default)]
    pub gas_used: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockResults {
    #[serde(default)]
    pub deliver_tx: Option<Vec<ResponseDeliverTx>>,
}

#[derive(Debug, Deserialize)]
pub struct ResultBlockResults {
    #[serde(default)]
    pub results: BlockResults,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BlockParams {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "MaxGas")]
    pub max_gas: u64,
}

#[derive(Debug, Deserialize)]
pub struct ConsensusParams {
    #[serde(rename = "Block")]
    pub block: BlockParams,
}

#[derive(Debug, Deserialize)]
pub struct ResultConsensusParams {
    pub consensus_params: ConsensusParams,
}

#[derive(Debug, Deserialize)]
pub struct ResponseQuery {
    #[serde(rename = "ResponseBase", default)]
    pub base: ResponseBase,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultABCIQuery {
    pub response: ResponseQuery,
}

#[derive(Debug, Deserialize)]
pub struct ResultBroadcastTxCommit {
    pub check_tx: ResponseDeliverTx,
    pub deliver_tx: ResponseDeliverTx,
}

#[derive(Debug, Deserialize)]
pub struct ResultBroadcastTx {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub log: String,
    pub hash: String,
}

impl ResultBroadcastTx {
    pub fn failure(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(error) if self.log.is_empty() => Some(error.to_string()),
            Some(_) => Some(self.log.clone()),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BaseAccount {
    pub address: Address,
    #[serde(default)]
    pub coins: Coins,
    #[serde_as(as = "DisplayFromStr")]
    pub account_number: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub sequence: u64,
}

#[derive(Debug, Deserialize)]
pub struct AccountEnvelope {
    #[serde(rename = "BaseAccount")]
    pub base_account: BaseAccount,
}

impl From<BaseAccount> for Account {
    fn from(account: BaseAccount) -> Self {
        Account {
            address: account.address,
            account_number: account.account_number,
            sequence: account.sequence,
            coins: account.coins,
        }
    }
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcGasPrice {
    #[serde_as(as = "DisplayFromStr")]
    pub gas: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub price: Coin,
}

impl From<RpcGasPrice> for GasPrice {
    fn from(price: RpcGasPrice) -> Self {
        GasPrice {
            gas: price.gas,
            price: price.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_account_query() {
        let address = Address::new([3; 20]);
        let envelope: AccountEnvelope = serde_json::from_value(json!({
            "BaseAccount": {
                "address": address.to_string(),
                "coins": "12000ugnot",
                "public_key": null,
                "account_number": "7",
                "sequence": "2"
            }
        }))
        .unwrap();

        let account = Account::from(envelope.base_account);
        assert_eq!(account.address, address);
        assert_eq!((account.account_number, account.sequence), (7, 2));
        assert_eq!(account.balance(), 12_000);
    }

    #[test]
    fn decodes_gas_price_and_limits() {
        let price: RpcGasPrice =
            serde_json::from_value(json!({"gas": "1000", "price": "1ugnot"})).unwrap();
        assert_eq!(
            GasPrice::from(price),
            GasPrice {
                gas: 1000,
                price: Coin::native(1)
            }
        );

        let params: ResultConsensusParams = serde_json::from_value(json!({
            "block_height": "5",
            "consensus_params": {"Block": {"MaxTxBytes": "1000000", "MaxGas": "3000000000"}}
        }))
        .unwrap();
        assert_eq!(params.consensus_params.block.max_gas, 3_000_000_000);
    }

    #[test]
    fn decodes_blocks_and_results() {
        let block: ResultBlock = serde_json::from_value(json!({
            "block": {
                "header": {"height": "12", "time": "2024-01-01T00:00:05Z", "num_txs": "1"},
                "data": {"txs": [encode_base64(b"raw")]}
            }
        }))
        .unwrap();
        assert_eq!(block.block.header.height, 12);
        assert_eq!(block.block.header.num_txs, 1);
        assert_eq!(block.block.data.txs, Some(vec![encode_base64(b"raw")]));

        let empty: ResultBlock = serde_json::from_value(json!({
            "block": {
                "header": {"height": "13", "time": "2024-01-01T00:00:06Z", "num_txs": "0"},
                "data": {"txs": null}
            }
        }))
        .unwrap();
        assert_eq!(empty.block.data.txs, None);

        let results: ResultBlockResults = serde_json::from_value(json!({
            "height": "12",
            "results": {"deliver_tx": [
                {"ResponseBase": {"Error": null, "Data": null, "Log": ""}, "GasUsed": "400"},
                {"ResponseBase": {"Error": null, "Data": null, "Log": ""}, "GasUsed": "600"}
            ]}
        }))
        .unwrap();
        let used: u64 = results
            .results
            .deliver_tx
            .unwrap()
            .iter()
            .map(|tx| tx.gas_used)
            .sum();
        assert_eq!(used, 1000);
    }

    #[test]
    fn failures_prefer_the_log() {
        let failed: ResponseBase = serde_json::from_value(json!({
            "Error": {"@type": "/std.UnauthorizedError"},
            "Log": "signature verification failed"
        }))
        .unwrap();
        assert_eq!(
            failed.failure().as_deref(),
            Some("signature verification failed")
        );

        let ok: ResponseBase = serde_json::from_value(json!({"Error": null})).unwrap();
        assert_eq!(ok.failure(), None);

        let broadcast: ResultBroadcastTx = serde_json::from_value(json!({
            "error": {"@type": "/std.OutOfGasError"},
            "hash": encode_base64(b"hash")
        }))
        .unwrap();
        assert!(broadcast.failure().unwrap().contains("OutOfGasError"));
        assert_eq!(decode_base64("hash", &broadcast.hash).unwrap(), b"hash");
    }
}
