// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use super::mix::MixConfig;
use super::payload::{add_package_msg, deployment_path, realm_call_msg, PackageKind};
use super::realm_call::predeploy_realm;
use super::{check_accounts, construct_signed, Runtime, RuntimeContext, RuntimeType};
use crate::error::StressError;
use crate::keys::KeyPair;
use crate::observer::Phase;
use crate::types::{Account, Coin, Fee, Msg, Tx};

/// Sends a weighted mix of the other runtimes, in shuffled order
pub struct MixedRuntime {
    config: MixConfig,
    timestamp: i64,
    realm_path: Option<String>,
    rng: Mutex<StdRng>,
}

impl MixedRuntime {
    pub fn new(config: MixConfig, timestamp: i64, rng: StdRng) -> Self {
        Self {
            config,
            timestamp,
            realm_path: None,
            rng: Mutex::new(rng),
        }
    }

    pub fn realm_path(&self) -> Option<&str> {
        self.realm_path.as_deref()
    }

    fn msg_for(
        &self,
        runtime_type: RuntimeType,
        creator: &Account,
        index: usize,
    ) -> Result<Msg, StressError> {
        let deployment = |kind| {
            add_package_msg(
                kind,
                creator.address,
                deployment_path(kind, &creator.address, self.timestamp, index),
            )
        };

        match runtime_type {
            RuntimeType::RealmCall => {
                let path = self
                    .realm_path()
                    .ok_or(StressError::NotInitialized(RuntimeType::Mixed))?;
                Ok(realm_call_msg(creator.address, path, index))
            }
            RuntimeType::RealmDeployment => Ok(deployment(PackageKind::Realm)),
            RuntimeType::PackageDeployment => Ok(deployment(PackageKind::Package)),
            RuntimeType::Mixed => Err(StressError::MixRatio(
                crate::error::MixRatioError::MixedInMix,
            )),
        }
    }

    /// One two-phase estimate per listed type
    async fn estimate_per_type(
        &self,
        ctx: &RuntimeContext,
        account: &Account,
        key: &KeyPair,
        types: Vec<RuntimeType>,
    ) -> Result<BTreeMap<RuntimeType, Fee>, StressError> {
        ctx.observer
            .phase_started(Phase::Estimation, types.len() as u64);
        let mut fees = BTreeMap::new();
        for runtime_type in types {
            let msg = self.msg_for(runtime_type, account, 0)?;
            let tx = ctx
                .estimate_and_sign(vec![msg], key, account, account.sequence)
                .await?;
            info!(%runtime_type, gas_wanted = tx.fee.gas_wanted, "Estimated gas");
            fees.insert(runtime_type, tx.fee);
            ctx.observer.advance(Phase::Estimation, 1);
        }
        ctx.observer.phase_finished(Phase::Estimation);

        Ok(fees)
    }

    /// Each type repeated by its count, then uniformly shuffled
    pub fn shuffled_sequence(&self, counts: &[(RuntimeType, u64)]) -> Vec<RuntimeType> {
        let mut sequence: Vec<RuntimeType> = counts
            .iter()
            .flat_map(|(runtime_type, count)| {
                std::iter::repeat(*runtime_type).take(*count as usize)
            })
            .collect();
        sequence.shuffle(&mut *self.rng.lock());
        sequence
    }
}

#[async_trait]
impl Runtime for MixedRuntime {
    fn runtime_type(&self) -> RuntimeType {
        RuntimeType::Mixed
    }

    async fn initialize(
        &mut self,
        ctx: &RuntimeContext,
        deployer: &Account,
        key: &KeyPair,
    ) -> Result<Vec<Tx>, StressError> {
        if !self.config.has_type(RuntimeType::RealmCall) {
            return Ok(vec![]);
        }

        let (path, tx) = predeploy_realm(ctx, deployer, key, self.timestamp).await?;
        self.realm_path = Some(path);
        Ok(vec![tx])
    }

    /// The shuffle decides which account sends which type, so every
    /// account is budgeted at the most expensive configured type, whatever
    /// share of its own transactions that type would get.
    async fn calculate_runtime_costs(
        &self,
        ctx: &RuntimeContext,
        account: &Account,
        key: &KeyPair,
        transactions: u64,
    ) -> Result<Coin, StressError> {
        let types = self
            .config
            .ratios()
            .iter()
            .map(|ratio| ratio.runtime_type)
            .collect();
        let fees = self.estimate_per_type(ctx, account, key, types).await?;

        let max_fee = fees
            .into_values()
            .map(|fee| fee.gas_fee)
            .max_by_key(|coin| coin.amount)
            .unwrap_or_else(|| Coin::native(0));

        Ok(Coin::new(
            max_fee.amount.saturating_mul(transactions),
            max_fee.denom,
        ))
    }

    async fn construct_transactions(
        &self,
        ctx: &RuntimeContext,
        keys: &[KeyPair],
        accounts: &[Account],
        transactions: u64,
    ) -> Result<Vec<Tx>, StressError> {
        check_accounts(keys, accounts)?;

        let counts = self.config.calculate_counts(transactions);
        let active = counts
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(runtime_type, _)| *runtime_type)
            .collect();
        let fees = self
            .estimate_per_type(ctx, &accounts[0], &keys[0], active)
            .await?;
        let sequence = self.shuffled_sequence(&counts);

        let mut type_indices: BTreeMap<RuntimeType, usize> = BTreeMap::new();
        construct_signed(ctx, keys, accounts, transactions, |index, creator| {
            let runtime_type = sequence[index];
            let type_index = type_indices.entry(runtime_type).or_insert(0);
            let msg = self.msg_for(runtime_type, creator, *type_index)?;
            *type_index += 1;

            let fee = fees
                .get(&runtime_type)
                .cloned()
                .ok_or(StressError::NotInitialized(RuntimeType::Mixed))?;
            Ok((msg, fee))
        })
    }
}
