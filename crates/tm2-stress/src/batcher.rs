// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{BroadcastResult, NodeClient};
use crate::error::StressError;
use crate::observer::{Observer, Phase};
use crate::types::{Tx, TxHash};

/// Hashes of the dispatched transactions, in dispatch order, and the chain
/// height observed right before the first batch went out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxBatchResult {
    pub tx_hashes: Vec<TxHash>,
    pub start_height: u64,
}

/// Splits `items` into `ceil(n / size)` contiguous chunks, in order.
/// There is always at least one chunk, even for empty input; a size of
/// zero puts everything in a single chunk.
pub fn generate_batches<T>(items: &[T], size: usize) -> Vec<&[T]> {
    if items.is_empty() || size == 0 {
        return vec![items];
    }
    items.chunks(size).collect()
}

pub struct Batcher {
    client: Arc<dyn NodeClient>,
    observer: Arc<dyn Observer>,
}

impl Batcher {
    pub fn new(client: Arc<dyn NodeClient>, observer: Arc<dyn Observer>) -> Self {
        Self { client, observer }
    }

    /// Sends `txs` in batches of `batch_size`, one batch at a time. Batches
    /// may share signers, so a batch is only sent once the previous one
    /// has returned.
    pub async fn batch_transactions(
        &self,
        txs: &[Tx],
        batch_size: usize,
    ) -> Result<TxBatchResult, StressError> {
        let start_height = self
            .client
            .get_latest_block_height()
            .await
            .map_err(|e| StressError::client("fetch latest block height", e))?;

        let batches = generate_batches(txs, batch_size);
        info!(
            transactions = txs.len(),
            batches = batches.len(),
            start_height,
            "Dispatching transactions"
        );
        self.observer
            .phase_started(Phase::Batching, batches.len() as u64);

        let mut results: Vec<BroadcastResult> = Vec::with_capacity(txs.len());
        for (index, chunk) in batches.iter().enumerate() {
            let mut batch = self.client.create_batch();
            for tx in chunk.iter() {
                batch
                    .add_tx_broadcast(tx.to_bytes()?)
                    .map_err(|e| StressError::client(format!("prepare batch {index}"), e))?;
            }

            let batch_results = batch
                .execute()
                .await
                .map_err(|e| StressError::client(format!("execute batch {index}"), e))?;
            if batch_results.len() != chunk.len() {
                return Err(StressError::Broadcast {
                    target: format!("batch {index}"),
                    reason: format!(
                        "expected {} results, got {}",
                        chunk.len(),
                        batch_results.len()
                    ),
                });
            }

            debug!(index, size = chunk.len(), "Executed batch");
            results.extend(batch_results);
            self.observer.advance(Phase::Batching, 1);
        }
        self.observer.phase_finished(Phase::Batching);

        let tx_hashes = results
            .into_iter()
            .map(|result| match result.error {
                Some(reason) => Err(StressError::Broadcast {
                    target: format!("transaction {}", result.hash),
                    reason,
                }),
                None => Ok(result.hash),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Dispatched {} transactions", tx_hashes.len());
        Ok(TxBatchResult {
            tx_hashes,
            start_height,
        })
    }
}

#[cfg(test)]
#[path = "unit_tests/batcher_tests.rs"]
mod batcher_tests;
