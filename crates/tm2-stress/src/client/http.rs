// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::{BatchRequestBuilder, ObjectParams};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    decode_base64, encode_base64, AccountEnvelope, ResponseDeliverTx, ResultABCIQuery,
    ResultBlock, ResultBlockResults, ResultBroadcastTx, ResultBroadcastTxCommit,
    ResultConsensusParams, ResultStatus, RpcGasPrice,
};
use super::{BroadcastResult, ClientError, NodeClient, TxBatch};
use crate::types::{Account, Address, Block, Coins, GasPrice, Tx, TxHash};

const SIMULATE_PATH: &str = ".app/simulate";
const GAS_PRICE_PATH: &str = "auth/gasprice";
const BROADCAST_SYNC: &str = "broadcast_tx_sync";

/// Tendermint2 JSON-RPC client over HTTP. Websocket URLs are accepted
/// and mapped onto the HTTP endpoint of the same node.
///
/// Transactions go out as their `bcs` wire bytes, signed over JSON sign
/// bytes. Neither is amino, so a stock TM2 node rejects the broadcasts and
/// simulations; queries, blocks and results decode as the node sends them.
#[derive(Clone)]
pub struct HttpNodeClient {
    client: HttpClient,
}

impl HttpNodeClient {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        let url = if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            url.to_string()
        };
        let client = HttpClientBuilder::default().build(url)?;
        Ok(Self { client })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, serde_json::Value)],
    ) -> Result<R, ClientError> {
        Ok(self.client.request(method, object_params(params)?).await?)
    }

    /// Runs an ABCI query and returns the base64-decoded `Data` payload
    async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, ClientError> {
        let result: ResultABCIQuery = self
            .call(
                "abci_query",
                &[
                    ("path", path.into()),
                    ("data", encode_base64(data).into()),
                ],
            )
            .await?;

        if let Some(reason) = result.response.base.failure() {
            return Err(ClientError::Query {
                path: path.to_string(),
                reason,
            });
        }

        // Simulation replies in Value, plain queries in Data
        let payload = result
            .response
            .value
            .filter(|v| !v.is_empty())
            .or(result.response.base.data)
            .unwrap_or_default();
        decode_base64("query response", &payload)
    }
}

fn object_params(params: &[(&str, serde_json::Value)]) -> Result<ObjectParams, ClientError> {
    let mut object = ObjectParams::new();
    for (name, value) in params {
        object
            .insert(name, value)
            .map_err(|e| ClientError::decode("request parameters", e))?;
    }
    Ok(object)
}

fn height_param(height: u64) -> serde_json::Value {
    height.to_string().into()
}

fn from_json<T: DeserializeOwned>(what: &'static str, data: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(data).map_err(|e| ClientError::decode(what, e))
}

fn encode_tx(tx: &Tx) -> Result<Vec<u8>, ClientError> {
    tx.to_bytes()
        .map_err(|e| ClientError::decode("transaction", e))
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn get_account(&self, address: &Address) -> Result<Account, ClientError> {
        let data = self
            .abci_query(&format!("auth/accounts/{address}"), &[])
            .await?;

        // Accounts the chain has never seen come back as null
        let envelope: Option<AccountEnvelope> = if data.is_empty() {
            None
        } else {
            from_json("account", &data)?
        };
        Ok(envelope
            .map(|e| Account::from(e.base_account))
            .unwrap_or_else(|| Account {
                address: *address,
                account_number: 0,
                sequence: 0,
                coins: Coins::default(),
            }))
    }

    async fn broadcast_transaction(&self, tx: &Tx) -> Result<(), ClientError> {
        let raw = encode_tx(tx)?;
        let result: ResultBroadcastTxCommit = self
            .call("broadcast_tx_commit", &[("tx", encode_base64(&raw).into())])
            .await?;

        if let Some(reason) = result.check_tx.base.failure() {
            return Err(ClientError::CheckTx(reason));
        }
        if let Some(reason) = result.deliver_tx.base.failure() {
            return Err(ClientError::DeliverTx(reason));
        }
        Ok(())
    }

    async fn estimate_gas(&self, tx: &Tx) -> Result<u64, ClientError> {
        let raw = encode_tx(tx)?;
        let data = self.abci_query(SIMULATE_PATH, &raw).await?;
        let deliver: ResponseDeliverTx = from_json("simulation result", &data)?;

        if let Some(reason) = deliver.base.failure() {
            return Err(ClientError::DeliverTx(reason));
        }
        debug!(gas_used = deliver.gas_used, "Simulated transaction");
        Ok(deliver.gas_used)
    }

    async fn fetch_gas_price(&self) -> Result<GasPrice, ClientError> {
        let data = self.abci_query(GAS_PRICE_PATH, &[]).await?;
        let price: RpcGasPrice = from_json("gas price", &data)?;
        Ok(price.into())
    }

    async fn get_latest_block_height(&self) -> Result<u64, ClientError> {
        let status: ResultStatus = self.call("status", &[]).await?;
        Ok(status.sync_info.latest_block_height)
    }

    async fn get_block(&self, height: u64) -> Result<Block, ClientError> {
        let result: ResultBlock = self.call("block", &[("height", height_param(height))]).await?;
        let header = result.block.header;
        let txs = result
            .block
            .data
            .txs
            .unwrap_or_default()
            .iter()
            .map(|tx| decode_base64("block transaction", tx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block {
            height: header.height,
            time: header.time,
            num_txs: header.num_txs,
            txs,
        })
    }

    async fn get_block_gas_used(&self, height: u64) -> Result<u64, ClientError> {
        let result: ResultBlockResults = self
            .call("block_results", &[("height", height_param(height))])
            .await?;
        Ok(result
            .results
            .deliver_tx
            .unwrap_or_default()
            .iter()
            .map(|tx| tx.gas_used)
            .sum())
    }

    async fn get_block_gas_limit(&self, height: u64) -> Result<u64, ClientError> {
        let result: ResultConsensusParams = self
            .call("consensus_params", &[("height", height_param(height))])
            .await?;
        Ok(result.consensus_params.block.max_gas)
    }

    fn create_batch(&self) -> Box<dyn TxBatch> {
        Box::new(HttpTxBatch {
            client: self.client.clone(),
            txs: vec![],
        })
    }
}

/// Queues `broadcast_tx_sync` calls and sends them as one JSON-RPC batch
pub struct HttpTxBatch {
    client: HttpClient,
    txs: Vec<Vec<u8>>,
}

#[async_trait]
impl TxBatch for HttpTxBatch {
    fn add_tx_broadcast(&mut self, tx: Vec<u8>) -> Result<(), ClientError> {
        self.txs.push(tx);
        Ok(())
    }

    async fn execute(self: Box<Self>) -> Result<Vec<BroadcastResult>, ClientError> {
        if self.txs.is_empty() {
            return Ok(vec![]);
        }

        let mut batch = BatchRequestBuilder::new();
        for tx in &self.txs {
            let mut params = ObjectParams::new();
            params
                .insert("tx", encode_base64(tx))
                .map_err(|e| ClientError::decode("request parameters", e))?;
            batch
                .insert(BROADCAST_SYNC, params)
                .map_err(|e| ClientError::decode("batch request", e))?;
        }

        let responses = self
            .client
            .batch_request::<ResultBroadcastTx>(batch)
            .await?;

        self.txs
            .iter()
            .zip(responses.into_iter())
            .map(|(raw, response)| match response {
                Ok(result) => Ok(BroadcastResult {
                    error: result.failure(),
                    hash: TxHash(decode_base64("transaction hash", &result.hash)?),
                }),
                Err(e) => Ok(BroadcastResult {
                    hash: TxHash::of(raw),
                    error: Some(e.message().to_string()),
                }),
            })
            .collect()
    }
}
