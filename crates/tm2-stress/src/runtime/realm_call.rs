// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tracing::info;

use super::payload::{add_package_msg, realm_call_msg, realm_call_path, PackageKind};
use super::{single_type_construct, single_type_costs, Runtime, RuntimeContext, RuntimeType};
use crate::error::StressError;
use crate::keys::KeyPair;
use crate::observer::Phase;
use crate::types::{Account, Coin, Tx};

/// Publishes the callable realm from `deployer` and returns its path with
/// the signed, fee-estimated publish transaction.
pub(crate) async fn predeploy_realm(
    ctx: &RuntimeContext,
    deployer: &Account,
    key: &KeyPair,
    timestamp: i64,
) -> Result<(String, Tx), StressError> {
    let path = realm_call_path(&deployer.address, timestamp);
    let msg = add_package_msg(PackageKind::Realm, deployer.address, path.clone());

    ctx.observer.phase_started(Phase::Estimation, 1);
    let tx = ctx
        .estimate_and_sign(vec![msg], key, deployer, deployer.sequence)
        .await?;
    ctx.observer.advance(Phase::Estimation, 1);
    ctx.observer.phase_finished(Phase::Estimation);

    info!(path, gas_wanted = tx.fee.gas_wanted, "Prepared realm predeployment");
    Ok((path, tx))
}

/// Calls a single predeployed realm from every run account
#[derive(Clone, Debug)]
pub struct RealmCallRuntime {
    timestamp: i64,
    realm_path: Option<String>,
}

impl RealmCallRuntime {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            realm_path: None,
        }
    }

    /// Path of the realm deployed by `initialize`
    pub fn realm_path(&self) -> Option<&str> {
        self.realm_path.as_deref()
    }

    fn path(&self) -> Result<&str, StressError> {
        self.realm_path()
            .ok_or(StressError::NotInitialized(RuntimeType::RealmCall))
    }
}

#[async_trait]
impl Runtime for RealmCallRuntime {
    fn runtime_type(&self) -> RuntimeType {
        RuntimeType::RealmCall
    }

    async fn initialize(
        &mut self,
        ctx: &RuntimeContext,
        deployer: &Account,
        key: &KeyPair,
    ) -> Result<Vec<Tx>, StressError> {
        let (path, tx) = predeploy_realm(ctx, deployer, key, self.timestamp).await?;
        self.realm_path = Some(path);
        Ok(vec![tx])
    }

    async fn calculate_runtime_costs(
        &self,
        ctx: &RuntimeContext,
        account: &Account,
        key: &KeyPair,
        transactions: u64,
    ) -> Result<Coin, StressError> {
        let msg = realm_call_msg(account.address, self.path()?, 0);
        single_type_costs(ctx, account, key, transactions, msg).await
    }

    async fn construct_transactions(
        &self,
        ctx: &RuntimeContext,
        keys: &[KeyPair],
        accounts: &[Account],
        transactions: u64,
    ) -> Result<Vec<Tx>, StressError> {
        let path = self.path()?;
        single_type_construct(ctx, keys, accounts, transactions, |creator, index| {
            realm_call_msg(creator.address, path, index)
        })
        .await
    }
}
