// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use parking_lot::Mutex;

use super::*;
use crate::observer::NoopObserver;
use crate::test_utils::{test_gas_price, MockClient};
use crate::types::{calculate_fee, Address, Coin, Coins, Msg, MsgSend};

fn txs(count: usize) -> Vec<Tx> {
    (0..count)
        .map(|index| {
            let mut tx = Tx::new(
                vec![Msg::Send(MsgSend {
                    from_address: Address::new([1; 20]),
                    to_address: Address::new([2; 20]),
                    amount: Coins::from(Coin::native(1)),
                })],
                calculate_fee(100_000, &test_gas_price()),
            );
            tx.memo = format!("tx-{index}");
            tx
        })
        .collect()
}

fn batcher(client: MockClient) -> Batcher {
    Batcher::new(Arc::new(client), Arc::new(NoopObserver))
}

#[test]
fn batches_cover_every_item_in_order() {
    for total in 1..=25usize {
        let items: Vec<usize> = (0..total).collect();
        for size in 1..=7usize {
            let batches = generate_batches(&items, size);

            assert_eq!(batches.len(), total.div_ceil(size), "{total} items by {size}");
            let (last, full) = batches.split_last().unwrap();
            assert!(full.iter().all(|batch| batch.len() == size));
            assert!(!last.is_empty() && last.len() <= size);
            assert_eq!(batches.concat(), items);
        }
    }
}

#[test]
fn degenerate_inputs_yield_one_batch() {
    let empty: Vec<u8> = vec![];
    assert_eq!(generate_batches(&empty, 5), vec![&[] as &[u8]]);

    let items = [1, 2, 3];
    assert_eq!(generate_batches(&items, 0), vec![&items[..]]);
    assert_eq!(generate_batches(&items, 10), vec![&items[..]]);
}

#[tokio::test]
async fn dispatches_batches_sequentially() {
    let sizes = Arc::new(Mutex::new(vec![]));
    let recorded = sizes.clone();
    let client = MockClient {
        get_latest_block_height: Box::new(|_: ()| Ok(41)),
        execute_batch: Arc::new(move |raw: Vec<Vec<u8>>| {
            recorded.lock().push(raw.len());
            Ok(raw
                .iter()
                .map(|tx| BroadcastResult {
                    hash: TxHash::of(tx),
                    error: None,
                })
                .collect())
        }),
        ..Default::default()
    };
    let txs = txs(5);

    let result = batcher(client).batch_transactions(&txs, 2).await.unwrap();

    assert_eq!(*sizes.lock(), vec![2, 2, 1]);
    assert_eq!(result.start_height, 41);
    let expected: Vec<TxHash> = txs.iter().map(|tx| tx.hash().unwrap()).collect();
    assert_eq!(result.tx_hashes, expected);
}

#[tokio::test]
async fn rejected_transaction_fails_the_dispatch() {
    let client = MockClient {
        get_latest_block_height: Box::new(|_: ()| Ok(1)),
        execute_batch: Arc::new(|raw: Vec<Vec<u8>>| {
            Ok(raw
                .iter()
                .enumerate()
                .map(|(index, tx)| BroadcastResult {
                    hash: TxHash::of(tx),
                    error: (index == 1).then(|| "invalid sequence".to_string()),
                })
                .collect())
        }),
        ..Default::default()
    };
    let txs = txs(3);

    let err = batcher(client)
        .batch_transactions(&txs, 3)
        .await
        .unwrap_err();

    match err {
        StressError::Broadcast { target, reason } => {
            assert_eq!(target, format!("transaction {}", txs[1].hash().unwrap()));
            assert_eq!(reason, "invalid sequence");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn short_batch_response_is_an_error() {
    let client = MockClient {
        get_latest_block_height: Box::new(|_: ()| Ok(1)),
        execute_batch: Arc::new(|_: Vec<Vec<u8>>| Ok(vec![])),
        ..Default::default()
    };

    let err = batcher(client)
        .batch_transactions(&txs(2), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, StressError::Broadcast { .. }));
}

#[tokio::test]
async fn height_lookup_failure_stops_before_dispatch() {
    let dispatched = Arc::new(Mutex::new(0));
    let recorded = dispatched.clone();
    let client = MockClient {
        execute_batch: Arc::new(move |raw: Vec<Vec<u8>>| {
            *recorded.lock() += raw.len();
            Ok(vec![])
        }),
        ..Default::default()
    };

    let err = batcher(client)
        .batch_transactions(&txs(2), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, StressError::Client { .. }));
    assert_eq!(*dispatched.lock(), 0);
}
