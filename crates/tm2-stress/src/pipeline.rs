// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batcher::Batcher;
use crate::client::NodeClient;
use crate::collector::{Collector, RunResult};
use crate::config::Config;
use crate::distributor::Distributor;
use crate::error::StressError;
use crate::keys::{derive_accounts, KeyPair, Secp256k1Signer, TxSigner};
use crate::observer::{Observer, Phase};
use crate::runtime::{get_runtime, GasParams, RuntimeContext};
use crate::types::{Account, Address, Tx};

/// Runs one stress test end to end: accounts, predeployment, funding,
/// construction, dispatch and collection, each phase finishing before the
/// next one starts.
pub struct Pipeline {
    config: Config,
    client: Arc<dyn NodeClient>,
    signer: Arc<dyn TxSigner>,
    observer: Arc<dyn Observer>,
    cancel: CancellationToken,
    timestamp: Option<i64>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        client: Arc<dyn NodeClient>,
        observer: Arc<dyn Observer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            client,
            signer: Arc::new(Secp256k1Signer),
            observer,
            cancel,
            timestamp: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn TxSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Fixes the timestamp used in deployment paths instead of the clock
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub async fn execute(&self) -> Result<RunResult> {
        let mode = self.config.validate()?;

        let keys = self.generate_accounts()?;
        let (funder, participants) = keys
            .split_first()
            .ok_or(StressError::AccountMismatch {
                keys: 0,
                accounts: self.config.sub_accounts as usize,
            })?;

        let gas = self
            .fetch_gas_params()
            .await
            .context("unable to fetch gas parameters")?;
        info!(
            max_gas = gas.max_gas,
            price = %gas.price.price,
            per_gas = gas.price.gas,
            "Fetched gas parameters"
        );
        let ctx = RuntimeContext {
            client: self.client.clone(),
            signer: self.signer.clone(),
            observer: self.observer.clone(),
            chain_id: self.config.chain_id.clone(),
            gas,
        };

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timestamp = self.timestamp.unwrap_or_else(|| Utc::now().timestamp());
        let mut runtime = get_runtime(mode.runtime_type, mode.mix, timestamp, rng)?;
        info!(mode = %runtime.runtime_type(), "Selected runtime");

        // Predeployment
        self.check_cancelled()?;
        let deployer = self.fetch_account(&funder.address()).await?;
        let predeploy = runtime
            .initialize(&ctx, &deployer, funder)
            .await
            .context("unable to initialize runtime")?;
        self.predeploy(&predeploy)
            .await
            .context("unable to broadcast predeploy transactions")?;

        // Funding
        self.check_cancelled()?;
        let deployer = self.fetch_account(&funder.address()).await?;
        let per_account = self
            .config
            .transactions
            .div_ceil(u64::from(self.config.sub_accounts));
        let required = runtime
            .calculate_runtime_costs(&ctx, &deployer, funder, per_account)
            .await
            .context("unable to calculate runtime costs")?;
        info!(%required, per_account, "Calculated per-account run cost");

        let targets: Vec<Address> = participants.iter().map(KeyPair::address).collect();
        let accounts = Distributor::new(
            self.client.clone(),
            self.signer.clone(),
            self.observer.clone(),
            self.config.chain_id.clone(),
            &ctx.gas.price,
        )
        .distribute(funder, &targets, &required)
        .await
        .context("unable to distribute funds")?;
        let run_keys = pair_keys(participants, &accounts)?;

        // Workload
        let transactions =
            funded_transactions(self.config.transactions, per_account, accounts.len());
        if transactions < self.config.transactions {
            warn!(
                funded = accounts.len(),
                requested = self.config.transactions,
                transactions,
                "Not every account was funded, shrinking the run to what the funded accounts cover"
            );
        }

        self.check_cancelled()?;
        let txs = runtime
            .construct_transactions(&ctx, &run_keys, &accounts, transactions)
            .await
            .context("unable to construct transactions")?;

        self.check_cancelled()?;
        let start_time = Utc::now();
        let dispatched = Batcher::new(self.client.clone(), self.observer.clone())
            .batch_transactions(&txs, self.config.batch)
            .await
            .context("unable to batch transactions")?;

        Collector::new(
            self.client.clone(),
            self.observer.clone(),
            self.cancel.clone(),
        )
        .with_poll_interval(self.config.poll_interval)
        .with_timeout(self.config.collect_timeout)
        .get_run_result(&dispatched.tx_hashes, dispatched.start_height, start_time)
        .await
        .context("unable to collect results")
    }

    fn check_cancelled(&self) -> Result<(), StressError> {
        if self.cancel.is_cancelled() {
            return Err(StressError::Cancelled);
        }
        Ok(())
    }

    fn generate_accounts(&self) -> Result<Vec<KeyPair>, StressError> {
        let total = u64::from(self.config.sub_accounts) + 1;
        self.observer.phase_started(Phase::Accounts, total);
        let keys = derive_accounts(&self.config.mnemonic, self.config.sub_accounts)?;
        self.observer.advance(Phase::Accounts, total);
        self.observer.phase_finished(Phase::Accounts);
        Ok(keys)
    }

    async fn fetch_gas_params(&self) -> Result<GasParams, StressError> {
        let price = self
            .client
            .fetch_gas_price()
            .await
            .map_err(|e| StressError::client("fetch gas price", e))?;
        let latest = self
            .client
            .get_latest_block_height()
            .await
            .map_err(|e| StressError::client("fetch latest block height", e))?;
        let max_gas = self
            .client
            .get_block_gas_limit(latest)
            .await
            .map_err(|e| StressError::client(format!("fetch gas limit of block {latest}"), e))?;
        Ok(GasParams { max_gas, price })
    }

    async fn fetch_account(&self, address: &Address) -> Result<Account, StressError> {
        self.client
            .get_account(address)
            .await
            .map_err(|e| StressError::client(format!("fetch account {address}"), e))
    }

    async fn predeploy(&self, txs: &[Tx]) -> Result<(), StressError> {
        if txs.is_empty() {
            return Ok(());
        }

        self.observer.phase_started(Phase::Predeploy, txs.len() as u64);
        for (index, tx) in txs.iter().enumerate() {
            self.client
                .broadcast_transaction(tx)
                .await
                .map_err(|e| StressError::Broadcast {
                    target: format!("predeploy transaction {index}"),
                    reason: e.to_string(),
                })?;
            self.observer.advance(Phase::Predeploy, 1);
        }
        self.observer.phase_finished(Phase::Predeploy);
        info!("Predeployed {} transactions", txs.len());
        Ok(())
    }
}

/// Transactions the funded accounts can pay for, each budgeted for
/// `per_account` of them
fn funded_transactions(requested: u64, per_account: u64, funded: usize) -> u64 {
    requested.min(per_account.saturating_mul(funded as u64))
}

/// Orders the participant keys to match the funded accounts
fn pair_keys(keys: &[KeyPair], accounts: &[Account]) -> Result<Vec<KeyPair>, StressError> {
    let by_address: HashMap<Address, &KeyPair> =
        keys.iter().map(|key| (key.address(), key)).collect();
    accounts
        .iter()
        .map(|account| {
            by_address
                .get(&account.address)
                .map(|key| (*key).clone())
                .ok_or(StressError::AccountMismatch {
                    keys: keys.len(),
                    accounts: accounts.len(),
                })
        })
        .collect()
}

#[cfg(test)]
#[path = "unit_tests/pipeline_tests.rs"]
mod pipeline_tests;
