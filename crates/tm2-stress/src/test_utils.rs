// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::{BroadcastResult, ClientError, NodeClient, TxBatch};
use crate::keys::{derive_accounts, KeyPair, Secp256k1Signer};
use crate::observer::NoopObserver;
use crate::runtime::{GasParams, RuntimeContext};
use crate::types::{Account, Address, Block, Coin, Coins, GasPrice, Tx, TxHash};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
     abandon abandon abandon abandon abandon abandon abandon abandon \
     abandon abandon abandon abandon abandon abandon abandon art";

pub const TEST_CHAIN_ID: &str = "dev";

pub const TEST_MAX_GAS: u64 = 10_000_000;

/// 1ugnot per 1000 gas
pub fn test_gas_price() -> GasPrice {
    GasPrice {
        gas: 1000,
        price: Coin::native(1),
    }
}

/// Keys 0..count derived from the test mnemonic
pub fn test_keys(count: u32) -> Vec<KeyPair> {
    derive_accounts(TEST_MNEMONIC, count - 1).unwrap()
}

pub fn account(address: Address, account_number: u64, sequence: u64, balance: u64) -> Account {
    Account {
        address,
        account_number,
        sequence,
        coins: if balance == 0 {
            Coins::default()
        } else {
            Coins::from(Coin::native(balance))
        },
    }
}

type Handler<A, R> = Box<dyn Fn(A) -> Result<R, ClientError> + Send + Sync>;
type BatchHandler = Arc<dyn Fn(Vec<Vec<u8>>) -> Result<Vec<BroadcastResult>, ClientError> + Send + Sync>;

fn not_mocked<A: 'static, R: 'static>(method: &'static str) -> Handler<A, R> {
    Box::new(move |_: A| Err(ClientError::Unavailable(format!("{method} not mocked"))))
}

/// Node client whose every call is answered by a replaceable closure
pub struct MockClient {
    pub get_account: Handler<Address, Account>,
    pub broadcast_transaction: Handler<Tx, ()>,
    pub estimate_gas: Handler<Tx, u64>,
    pub fetch_gas_price: Handler<(), GasPrice>,
    pub get_latest_block_height: Handler<(), u64>,
    pub get_block: Handler<u64, Block>,
    pub get_block_gas_used: Handler<u64, u64>,
    pub get_block_gas_limit: Handler<u64, u64>,
    pub execute_batch: BatchHandler,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            get_account: not_mocked("get_account"),
            broadcast_transaction: not_mocked("broadcast_transaction"),
            estimate_gas: not_mocked("estimate_gas"),
            fetch_gas_price: not_mocked("fetch_gas_price"),
            get_latest_block_height: not_mocked("get_latest_block_height"),
            get_block: not_mocked("get_block"),
            get_block_gas_used: not_mocked("get_block_gas_used"),
            get_block_gas_limit: not_mocked("get_block_gas_limit"),
            execute_batch: Arc::new(|txs: Vec<Vec<u8>>| {
                Ok(txs
                    .iter()
                    .map(|raw| BroadcastResult {
                        hash: TxHash::of(raw),
                        error: None,
                    })
                    .collect())
            }),
        }
    }
}

#[async_trait]
impl NodeClient for MockClient {
    async fn get_account(&self, address: &Address) -> Result<Account, ClientError> {
        (self.get_account)(*address)
    }

    async fn broadcast_transaction(&self, tx: &Tx) -> Result<(), ClientError> {
        (self.broadcast_transaction)(tx.clone())
    }

    async fn estimate_gas(&self, tx: &Tx) -> Result<u64, ClientError> {
        (self.estimate_gas)(tx.clone())
    }

    async fn fetch_gas_price(&self) -> Result<GasPrice, ClientError> {
        (self.fetch_gas_price)(())
    }

    async fn get_latest_block_height(&self) -> Result<u64, ClientError> {
        (self.get_latest_block_height)(())
    }

    async fn get_block(&self, height: u64) -> Result<Block, ClientError> {
        (self.get_block)(height)
    }

    async fn get_block_gas_used(&self, height: u64) -> Result<u64, ClientError> {
        (self.get_block_gas_used)(height)
    }

    async fn get_block_gas_limit(&self, height: u64) -> Result<u64, ClientError> {
        (self.get_block_gas_limit)(height)
    }

    fn create_batch(&self) -> Box<dyn TxBatch> {
        Box::new(MockBatch {
            txs: vec![],
            execute: self.execute_batch.clone(),
        })
    }
}

pub struct MockBatch {
    txs: Vec<Vec<u8>>,
    execute: BatchHandler,
}

#[async_trait]
impl TxBatch for MockBatch {
    fn add_tx_broadcast(&mut self, tx: Vec<u8>) -> Result<(), ClientError> {
        self.txs.push(tx);
        Ok(())
    }

    async fn execute(self: Box<Self>) -> Result<Vec<BroadcastResult>, ClientError> {
        let MockBatch { txs, execute } = *self;
        execute(txs)
    }
}

pub fn runtime_context(client: MockClient) -> RuntimeContext {
    RuntimeContext {
        client: Arc::new(client),
        signer: Arc::new(Secp256k1Signer),
        observer: Arc::new(NoopObserver),
        chain_id: TEST_CHAIN_ID.to_string(),
        gas: GasParams {
            max_gas: TEST_MAX_GAS,
            price: test_gas_price(),
        },
    }
}
