// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use super::payload::{add_package_msg, deployment_path, PackageKind};
use super::{single_type_construct, single_type_costs, Runtime, RuntimeContext, RuntimeType};
use crate::error::StressError;
use crate::keys::KeyPair;
use crate::types::{Account, Coin, Msg, Tx};

/// Publishes a fresh package per transaction. The realm and package
/// flavours differ only in path prefix and source.
#[derive(Clone, Debug)]
pub struct DeploymentRuntime {
    kind: PackageKind,
    timestamp: i64,
}

impl DeploymentRuntime {
    pub fn realm(timestamp: i64) -> Self {
        Self {
            kind: PackageKind::Realm,
            timestamp,
        }
    }

    pub fn package(timestamp: i64) -> Self {
        Self {
            kind: PackageKind::Package,
            timestamp,
        }
    }

    fn msg(&self, creator: &Account, index: usize) -> Msg {
        add_package_msg(
            self.kind,
            creator.address,
            deployment_path(self.kind, &creator.address, self.timestamp, index),
        )
    }
}

#[async_trait]
impl Runtime for DeploymentRuntime {
    fn runtime_type(&self) -> RuntimeType {
        match self.kind {
            PackageKind::Realm => RuntimeType::RealmDeployment,
            PackageKind::Package => RuntimeType::PackageDeployment,
        }
    }

    async fn initialize(
        &mut self,
        _ctx: &RuntimeContext,
        _deployer: &Account,
        _key: &KeyPair,
    ) -> Result<Vec<Tx>, StressError> {
        Ok(vec![])
    }

    async fn calculate_runtime_costs(
        &self,
        ctx: &RuntimeContext,
        account: &Account,
        key: &KeyPair,
        transactions: u64,
    ) -> Result<Coin, StressError> {
        single_type_costs(ctx, account, key, transactions, self.msg(account, 0)).await
    }

    async fn construct_transactions(
        &self,
        ctx: &RuntimeContext,
        keys: &[KeyPair],
        accounts: &[Account],
        transactions: u64,
    ) -> Result<Vec<Tx>, StressError> {
        single_type_construct(ctx, keys, accounts, transactions, |creator, index| {
            self.msg(creator, index)
        })
        .await
    }
}
