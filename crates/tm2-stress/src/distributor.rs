// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::NodeClient;
use crate::error::StressError;
use crate::keys::{KeyPair, SignCfg, TxSigner};
use crate::observer::{Observer, Phase};
use crate::runtime::NonceTracker;
use crate::types::{calculate_fee, Account, Address, Coin, Coins, Fee, GasPrice, Msg, MsgSend, Tx};

/// Gas reserved for each funding transfer
pub const TRANSFER_GAS: u64 = 100_000;

/// Tops up run accounts from a single funder so each can pay for its share
/// of the run.
pub struct Distributor {
    client: Arc<dyn NodeClient>,
    signer: Arc<dyn TxSigner>,
    observer: Arc<dyn Observer>,
    chain_id: String,
    transfer_fee: Fee,
}

struct Shortfall {
    address: Address,
    missing: u64,
}

impl Distributor {
    pub fn new(
        client: Arc<dyn NodeClient>,
        signer: Arc<dyn TxSigner>,
        observer: Arc<dyn Observer>,
        chain_id: String,
        gas_price: &GasPrice,
    ) -> Self {
        Self {
            client,
            signer,
            observer,
            chain_id,
            transfer_fee: calculate_fee(TRANSFER_GAS, gas_price),
        }
    }

    pub fn transfer_fee(&self) -> &Fee {
        &self.transfer_fee
    }

    /// Makes sure every target holds at least `required`. Accounts with the
    /// smallest shortfall are funded first, as many as the funder can
    /// afford; the rest are left out of the returned set. Fails only when
    /// not a single shortfall can be covered.
    pub async fn distribute(
        &self,
        funder: &KeyPair,
        targets: &[Address],
        required: &Coin,
    ) -> Result<Vec<Account>, StressError> {
        let mut ready = Vec::with_capacity(targets.len());
        let mut shortfalls = vec![];

        for address in targets {
            let account = self
                .client
                .get_account(address)
                .await
                .map_err(|e| StressError::client(format!("fetch account {address}"), e))?;
            let balance = account.coins.amount_of(&required.denom);
            if balance < required.amount {
                shortfalls.push(Shortfall {
                    address: *address,
                    missing: required.amount - balance,
                });
            } else {
                ready.push(account);
            }
        }

        if shortfalls.is_empty() {
            info!("All {} accounts are already funded", ready.len());
            return Ok(ready);
        }

        // Stable, so equal shortfalls keep their target order
        shortfalls.sort_by_key(|s| s.missing);

        let funder_address = funder.address();
        let funder_account = self
            .client
            .get_account(&funder_address)
            .await
            .map_err(|e| StressError::client(format!("fetch funder {funder_address}"), e))?;

        let fee = self.transfer_fee.gas_fee.amount;
        let mut remaining = funder_account.coins.amount_of(&required.denom);
        let fundable = shortfalls
            .iter()
            .take_while(|shortfall| {
                let cost = shortfall.missing.saturating_add(fee);
                if cost > remaining {
                    return false;
                }
                remaining -= cost;
                true
            })
            .count();

        if fundable == 0 {
            return Err(StressError::InsufficientFunds {
                balance: Coin::new(
                    funder_account.coins.amount_of(&required.denom),
                    required.denom.clone(),
                ),
                required: Coin::new(
                    shortfalls[0].missing.saturating_add(fee),
                    required.denom.clone(),
                ),
            });
        }
        if fundable < shortfalls.len() {
            info!(
                fundable,
                short = shortfalls.len(),
                "Funder can only cover part of the accounts"
            );
        }

        let mut nonces = NonceTracker::new();
        self.observer
            .phase_started(Phase::Distribution, fundable as u64);

        for shortfall in &shortfalls[..fundable] {
            let mut tx = Tx::new(
                vec![Msg::Send(MsgSend {
                    from_address: funder_address,
                    to_address: shortfall.address,
                    amount: Coins::from(Coin::new(shortfall.missing, required.denom.clone())),
                })],
                self.transfer_fee.clone(),
            );
            self.signer.sign_tx(
                &mut tx,
                funder,
                &SignCfg {
                    chain_id: self.chain_id.clone(),
                    account_number: funder_account.account_number,
                    sequence: nonces.next(&funder_account),
                },
            )?;

            self.client
                .broadcast_transaction(&tx)
                .await
                .map_err(|e| StressError::Broadcast {
                    target: format!("transfer to {}", shortfall.address),
                    reason: e.to_string(),
                })?;
            debug!(address = %shortfall.address, amount = shortfall.missing, "Funded account");

            // The account number is only known once the chain has seen it
            let funded = self
                .client
                .get_account(&shortfall.address)
                .await
                .map_err(|e| {
                    StressError::client(format!("fetch funded account {}", shortfall.address), e)
                })?;
            ready.push(funded);
            self.observer.advance(Phase::Distribution, 1);
        }

        self.observer.phase_finished(Phase::Distribution);
        info!("Funded {fundable} accounts, {} ready for the run", ready.len());
        Ok(ready)
    }
}

#[cfg(test)]
#[path = "unit_tests/distributor_tests.rs"]
mod distributor_tests;
