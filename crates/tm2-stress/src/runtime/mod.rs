// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info};

use crate::client::NodeClient;
use crate::error::StressError;
use crate::keys::{KeyPair, SignCfg, TxSigner};
use crate::observer::{Observer, Phase};
use crate::types::{calculate_fee, Account, Coin, Fee, GasPrice, Msg, Tx};

pub mod deployment;
pub mod mix;
pub mod mixed;
pub mod payload;
pub mod realm_call;

pub use deployment::DeploymentRuntime;
pub use mix::{MixConfig, MixRatio};
pub use mixed::MixedRuntime;
pub use realm_call::RealmCallRuntime;

/// Gas added on top of every simulated estimate before the fee is fixed
pub const GAS_BUFFER: u64 = 10_000;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeType {
    RealmDeployment,
    PackageDeployment,
    RealmCall,
    Mixed,
}

impl RuntimeType {
    /// Whether this type may appear inside a mix ratio
    pub fn is_mixable(self) -> bool {
        !matches!(self, RuntimeType::Mixed)
    }
}

/// Gas limits read from the chain once per run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasParams {
    /// Block gas limit, the upper bound used to sign simulations
    pub max_gas: u64,
    pub price: GasPrice,
}

/// Collaborators shared by every runtime call of a run
#[derive(Clone)]
pub struct RuntimeContext {
    pub client: Arc<dyn NodeClient>,
    pub signer: Arc<dyn TxSigner>,
    pub observer: Arc<dyn Observer>,
    pub chain_id: String,
    pub gas: GasParams,
}

impl RuntimeContext {
    pub fn sign(
        &self,
        tx: &mut Tx,
        key: &KeyPair,
        account_number: u64,
        sequence: u64,
    ) -> Result<(), StressError> {
        self.signer.sign_tx(
            tx,
            key,
            &SignCfg {
                chain_id: self.chain_id.clone(),
                account_number,
                sequence,
            },
        )
    }

    /// Builds a signed transaction for `msgs` whose fee comes from a
    /// simulation. The first signature covers a block-max fee and is only
    /// used for the simulation; the final fee is the estimate plus
    /// [`GAS_BUFFER`], signed again.
    pub async fn estimate_and_sign(
        &self,
        msgs: Vec<Msg>,
        key: &KeyPair,
        account: &Account,
        sequence: u64,
    ) -> Result<Tx, StressError> {
        let mut tx = Tx::new(msgs, calculate_fee(self.gas.max_gas, &self.gas.price));
        self.sign(&mut tx, key, account.account_number, sequence)?;

        let estimated = self
            .client
            .estimate_gas(&tx)
            .await
            .map_err(|e| StressError::estimation(format!("account {}", account.address), e))?;

        tx.set_fee(calculate_fee(
            estimated.saturating_add(GAS_BUFFER),
            &self.gas.price,
        ));
        self.sign(&mut tx, key, account.account_number, sequence)?;

        debug!(estimated, gas_wanted = tx.fee.gas_wanted, "Estimated transaction fee");
        Ok(tx)
    }
}

/// A traffic profile: what the run sends and how much it costs
#[async_trait]
pub trait Runtime: Send + Sync {
    fn runtime_type(&self) -> RuntimeType;

    /// Prepares transactions that must be committed before the run,
    /// signed by the funded `deployer`. Most runtimes need none.
    async fn initialize(
        &mut self,
        ctx: &RuntimeContext,
        deployer: &Account,
        key: &KeyPair,
    ) -> Result<Vec<Tx>, StressError>;

    /// The coin `account` must hold to send `transactions` transactions
    async fn calculate_runtime_costs(
        &self,
        ctx: &RuntimeContext,
        account: &Account,
        key: &KeyPair,
        transactions: u64,
    ) -> Result<Coin, StressError>;

    /// Builds and signs the run workload. Creators rotate round-robin over
    /// `accounts`, paired index by index with `keys`.
    async fn construct_transactions(
        &self,
        ctx: &RuntimeContext,
        keys: &[KeyPair],
        accounts: &[Account],
        transactions: u64,
    ) -> Result<Vec<Tx>, StressError>;
}

/// Returns the runtime for `runtime_type`. The mixed runtime needs a mix
/// configuration and a shuffle source; the run timestamp keeps deployment
/// paths unique across runs.
pub fn get_runtime(
    runtime_type: RuntimeType,
    mix: Option<MixConfig>,
    timestamp: i64,
    rng: StdRng,
) -> Result<Box<dyn Runtime>, StressError> {
    Ok(match runtime_type {
        RuntimeType::RealmDeployment => Box::new(DeploymentRuntime::realm(timestamp)),
        RuntimeType::PackageDeployment => Box::new(DeploymentRuntime::package(timestamp)),
        RuntimeType::RealmCall => Box::new(RealmCallRuntime::new(timestamp)),
        RuntimeType::Mixed => {
            let config = mix.ok_or(StressError::Config(
                crate::error::ConfigError::MissingMixRatio,
            ))?;
            Box::new(MixedRuntime::new(config, timestamp, rng))
        }
    })
}

/// Next sequence per account number. Seeded from the account's on-chain
/// sequence on first use, then incremented locally.
#[derive(Debug, Default)]
pub struct NonceTracker {
    nonces: HashMap<u64, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence to sign with and reserves it
    pub fn next(&mut self, account: &Account) -> u64 {
        let nonce = self
            .nonces
            .entry(account.account_number)
            .or_insert(account.sequence);
        let current = *nonce;
        *nonce += 1;
        current
    }
}

pub(crate) fn check_accounts(keys: &[KeyPair], accounts: &[Account]) -> Result<(), StressError> {
    if accounts.is_empty() || keys.len() != accounts.len() {
        return Err(StressError::AccountMismatch {
            keys: keys.len(),
            accounts: accounts.len(),
        });
    }
    Ok(())
}

/// Signs one transaction per index, rotating creators over `accounts` and
/// tracking their sequences locally. `build` supplies the message and fee.
pub(crate) fn construct_signed<F>(
    ctx: &RuntimeContext,
    keys: &[KeyPair],
    accounts: &[Account],
    transactions: u64,
    mut build: F,
) -> Result<Vec<Tx>, StressError>
where
    F: FnMut(usize, &Account) -> Result<(Msg, Fee), StressError>,
{
    check_accounts(keys, accounts)?;

    let mut nonces = NonceTracker::new();
    let mut txs = Vec::with_capacity(transactions as usize);
    ctx.observer.phase_started(Phase::Construction, transactions);

    for index in 0..transactions as usize {
        let slot = index % accounts.len();
        let (creator, key) = (&accounts[slot], &keys[slot]);

        let (msg, fee) = build(index, creator)?;
        let mut tx = Tx::new(vec![msg], fee);
        let sequence = nonces.next(creator);
        ctx.sign(&mut tx, key, creator.account_number, sequence)?;

        txs.push(tx);
        ctx.observer.advance(Phase::Construction, 1);
    }

    ctx.observer.phase_finished(Phase::Construction);
    info!("Constructed {} transactions", txs.len());
    Ok(txs)
}

/// Cost of `transactions` transactions at the fee estimated for `msg`
pub(crate) async fn single_type_costs(
    ctx: &RuntimeContext,
    account: &Account,
    key: &KeyPair,
    transactions: u64,
    msg: Msg,
) -> Result<Coin, StressError> {
    ctx.observer.phase_started(Phase::Estimation, 1);
    let tx = ctx
        .estimate_and_sign(vec![msg], key, account, account.sequence)
        .await?;
    ctx.observer.advance(Phase::Estimation, 1);
    ctx.observer.phase_finished(Phase::Estimation);

    Ok(Coin::new(
        tx.fee.gas_fee.amount.saturating_mul(transactions),
        tx.fee.gas_fee.denom,
    ))
}

/// Estimates the fee once with the first account, then builds every
/// transaction with that fee.
pub(crate) async fn single_type_construct<F>(
    ctx: &RuntimeContext,
    keys: &[KeyPair],
    accounts: &[Account],
    transactions: u64,
    msg: F,
) -> Result<Vec<Tx>, StressError>
where
    F: Fn(&Account, usize) -> Msg + Send + Sync,
{
    check_accounts(keys, accounts)?;

    let (first, first_key) = (&accounts[0], &keys[0]);
    let fee = ctx
        .estimate_and_sign(vec![msg(first, 0)], first_key, first, first.sequence)
        .await?
        .fee;

    construct_signed(ctx, keys, accounts, transactions, |index, creator| {
        Ok((msg(creator, index), fee.clone()))
    })
}

#[cfg(test)]
#[path = "../unit_tests/runtime_tests.rs"]
mod runtime_tests;
