// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use parking_lot::Mutex;

use super::*;
use crate::client::ClientError;
use crate::keys::Secp256k1Signer;
use crate::observer::NoopObserver;
use crate::test_utils::{account, test_gas_price, test_keys, MockClient, TEST_CHAIN_ID};
use crate::types::DENOMINATION;

const FUNDER_NUMBER: u64 = 1;

/// Minimal bank: transfers move coins and charge the fee to the sender
struct Ledger {
    accounts: HashMap<Address, Account>,
    next_number: u64,
    transfers: Vec<Tx>,
    fail_at: Option<usize>,
}

impl Ledger {
    fn new(funder: Address, balance: u64) -> Arc<Mutex<Self>> {
        let mut ledger = Self {
            accounts: HashMap::new(),
            next_number: FUNDER_NUMBER,
            transfers: vec![],
            fail_at: None,
        };
        ledger.open(funder, balance);
        Arc::new(Mutex::new(ledger))
    }

    fn open(&mut self, address: Address, balance: u64) {
        let number = self.next_number;
        self.next_number += 1;
        self.accounts
            .insert(address, account(address, number, 0, balance));
    }

    fn account(&self, address: Address) -> Account {
        self.accounts
            .get(&address)
            .cloned()
            .unwrap_or_else(|| account(address, 0, 0, 0))
    }

    fn apply(&mut self, tx: Tx) -> Result<(), ClientError> {
        if self.fail_at == Some(self.transfers.len()) {
            return Err(ClientError::DeliverTx("out of gas".to_string()));
        }
        let Msg::Send(send) = &tx.msgs[0] else {
            return Err(ClientError::CheckTx("unexpected message".to_string()));
        };

        let amount = send.amount.amount_of(DENOMINATION);
        let cost = amount + tx.fee.gas_fee.amount;
        let sender = self.account(send.from_address);
        if sender.balance() < cost {
            return Err(ClientError::CheckTx("insufficient funds".to_string()));
        }
        self.accounts.insert(
            sender.address,
            account(
                sender.address,
                sender.account_number,
                sender.sequence + 1,
                sender.balance() - cost,
            ),
        );

        match self.accounts.get(&send.to_address).cloned() {
            Some(target) => {
                self.accounts.insert(
                    target.address,
                    account(
                        target.address,
                        target.account_number,
                        target.sequence,
                        target.balance() + amount,
                    ),
                );
            }
            None => self.open(send.to_address, amount),
        }

        self.transfers.push(tx);
        Ok(())
    }

    fn recipients(&self) -> Vec<(Address, u64)> {
        self.transfers
            .iter()
            .map(|tx| match &tx.msgs[0] {
                Msg::Send(send) => (send.to_address, send.amount.amount_of(DENOMINATION)),
                other => panic!("unexpected message {other:?}"),
            })
            .collect()
    }
}

fn distributor(ledger: &Arc<Mutex<Ledger>>) -> Distributor {
    let (reader, writer) = (ledger.clone(), ledger.clone());
    let client = MockClient {
        get_account: Box::new(move |address: Address| Ok(reader.lock().account(address))),
        broadcast_transaction: Box::new(move |tx: Tx| writer.lock().apply(tx)),
        ..Default::default()
    };

    Distributor::new(
        Arc::new(client),
        Arc::new(Secp256k1Signer),
        Arc::new(NoopObserver),
        TEST_CHAIN_ID.to_string(),
        &test_gas_price(),
    )
}

fn setup(funder_balance: u64) -> (Vec<KeyPair>, Vec<Address>, Arc<Mutex<Ledger>>) {
    let keys = test_keys(11);
    let targets = keys[1..].iter().map(KeyPair::address).collect();
    let ledger = Ledger::new(keys[0].address(), funder_balance);
    (keys, targets, ledger)
}

#[test]
fn transfer_fee_covers_transfer_gas() {
    let (_, _, ledger) = setup(0);
    let distributor = distributor(&ledger);
    assert_eq!(distributor.transfer_fee().gas_wanted, TRANSFER_GAS);
    assert_eq!(distributor.transfer_fee().gas_fee, Coin::native(100));
}

#[tokio::test]
async fn funds_as_many_accounts_as_the_funder_affords() {
    let (keys, targets, ledger) = setup(5500);

    let funded = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap();

    // (1000 + 100) * 5 = 5500
    assert_eq!(funded.len(), 5);
    let expected: Vec<Address> = targets[..5].to_vec();
    assert_eq!(
        funded.iter().map(|a| a.address).collect::<Vec<_>>(),
        expected
    );
    assert!(funded.iter().all(|a| a.balance() == 1000));
    assert!(funded.iter().all(|a| a.account_number > FUNDER_NUMBER));
    assert_eq!(ledger.lock().account(keys[0].address()).balance(), 0);
}

#[tokio::test]
async fn smallest_shortfalls_are_funded_first() {
    let (keys, targets, ledger) = setup(5500);
    {
        let mut ledger = ledger.lock();
        // shortfalls of 1000, 990, ..., 910
        for (i, target) in targets.iter().enumerate().skip(1) {
            ledger.open(*target, i as u64 * 10);
        }
    }

    let funded = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap();

    // 910 + 920 + 930 + 940 + 950 plus five fees is 5150, a sixth would
    // need another 1060
    let ledger = ledger.lock();
    assert_eq!(
        ledger.recipients(),
        vec![
            (targets[9], 910),
            (targets[8], 920),
            (targets[7], 930),
            (targets[6], 940),
            (targets[5], 950),
        ]
    );
    assert_eq!(
        funded.iter().map(|a| a.address).collect::<Vec<_>>(),
        vec![targets[9], targets[8], targets[7], targets[6], targets[5]]
    );
    assert_eq!(ledger.account(keys[0].address()).balance(), 350);

    // the funder signs each transfer with its next sequence
    let verifying_key = VerifyingKey::from_sec1_bytes(keys[0].public_key()).unwrap();
    for (sequence, tx) in ledger.transfers.iter().enumerate() {
        let signature = EcdsaSignature::try_from(tx.signatures[0].signature.as_slice()).unwrap();
        let sign_bytes = tx
            .sign_bytes(TEST_CHAIN_ID, FUNDER_NUMBER, sequence as u64)
            .unwrap();
        verifying_key.verify(&sign_bytes, &signature).unwrap();
    }
}

#[tokio::test]
async fn empty_funder_cannot_fund_anyone() {
    let (keys, targets, ledger) = setup(0);

    let err = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap_err();

    match err {
        StressError::InsufficientFunds { balance, required } => {
            assert_eq!(balance, Coin::native(0));
            assert_eq!(required, Coin::native(1100));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(ledger.lock().transfers.is_empty());
}

#[tokio::test]
async fn rich_funder_funds_everyone() {
    let (keys, targets, ledger) = setup(1_000_000);

    let funded = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap();

    assert_eq!(funded.len(), 10);
    assert_eq!(ledger.lock().transfers.len(), 10);
    assert_eq!(
        ledger.lock().account(keys[0].address()).balance(),
        1_000_000 - 10 * 1100
    );
}

#[tokio::test]
async fn funded_accounts_are_left_alone() {
    let (keys, targets, ledger) = setup(0);
    {
        let mut ledger = ledger.lock();
        for target in &targets {
            ledger.open(*target, 2000);
        }
    }

    let funded = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap();

    assert_eq!(
        funded.iter().map(|a| a.address).collect::<Vec<_>>(),
        targets
    );
    assert!(ledger.lock().transfers.is_empty());
}

#[tokio::test]
async fn ready_accounts_come_before_funded_ones() {
    let (keys, targets, ledger) = setup(100_000);
    {
        let mut ledger = ledger.lock();
        for target in &targets[5..] {
            ledger.open(*target, 1000);
        }
    }

    let funded = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap();

    let order: Vec<Address> = funded.iter().map(|a| a.address).collect();
    let mut expected = targets[5..].to_vec();
    expected.extend_from_slice(&targets[..5]);
    assert_eq!(order, expected);
    assert_eq!(ledger.lock().transfers.len(), 5);
}

#[tokio::test]
async fn failed_transfer_aborts_distribution() {
    let (keys, targets, ledger) = setup(1_000_000);
    ledger.lock().fail_at = Some(1);

    let err = distributor(&ledger)
        .distribute(&keys[0], &targets, &Coin::native(1000))
        .await
        .unwrap_err();

    assert!(matches!(err, StressError::Broadcast { .. }));
    assert!(err.to_string().contains(&targets[1].to_string()));
    assert_eq!(ledger.lock().transfers.len(), 1);
}
