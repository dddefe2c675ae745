// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Account, Address, Block, GasPrice, Tx, TxHash};

mod http;
pub mod types;

pub use http::HttpNodeClient;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    #[error("Unable to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Query {path} failed: {reason}")]
    Query { path: String, reason: String },

    #[error("Transaction check failed: {0}")]
    CheckTx(String),

    #[error("Transaction delivery failed: {0}")]
    DeliverTx(String),

    #[error("Node unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        ClientError::Decode {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Outcome of one fire-and-forget broadcast inside a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastResult {
    pub hash: TxHash,
    pub error: Option<String>,
}

/// The chain node, as seen by the stress pipeline. Every call completes
/// before the caller moves on; broadcast waits for the commit outcome.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_account(&self, address: &Address) -> Result<Account, ClientError>;

    /// Broadcasts `tx` and waits until it is committed. Check and
    /// delivery failures are both reported as errors.
    async fn broadcast_transaction(&self, tx: &Tx) -> Result<(), ClientError>;

    /// Simulates `tx` and returns the gas it consumed
    async fn estimate_gas(&self, tx: &Tx) -> Result<u64, ClientError>;

    async fn fetch_gas_price(&self) -> Result<GasPrice, ClientError>;

    async fn get_latest_block_height(&self) -> Result<u64, ClientError>;

    async fn get_block(&self, height: u64) -> Result<Block, ClientError>;

    async fn get_block_gas_used(&self, height: u64) -> Result<u64, ClientError>;

    async fn get_block_gas_limit(&self, height: u64) -> Result<u64, ClientError>;

    fn create_batch(&self) -> Box<dyn TxBatch>;
}

/// A group of broadcasts sent to the node in a single round trip
#[async_trait]
pub trait TxBatch: Send {
    fn add_tx_broadcast(&mut self, tx: Vec<u8>) -> Result<(), ClientError>;

    /// Sends every queued broadcast, returning one result per
    /// transaction in the order they were added.
    async fn execute(self: Box<Self>) -> Result<Vec<BroadcastResult>, ClientError>;
}
