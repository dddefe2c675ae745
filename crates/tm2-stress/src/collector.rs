// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::NodeClient;
use crate::error::StressError;
use crate::observer::{Observer, Phase};
use crate::types::{Block, TxHash};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Throughput of one stress run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "averageTPS")]
    pub average_tps: f64,
    pub blocks: Vec<BlockResult>,
}

/// A block that contained at least one run transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResult {
    #[serde(rename = "blockNumber")]
    pub number: u64,
    #[serde(rename = "created")]
    pub time: DateTime<Utc>,
    #[serde(rename = "numTransactions")]
    pub transactions: u64,
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    #[serde(rename = "gasLimit")]
    pub gas_limit: u64,
}

/// Dispatched hashes not yet seen on chain
struct TxLookup {
    pending: HashSet<TxHash>,
}

impl TxLookup {
    fn new(hashes: &[TxHash]) -> Self {
        Self {
            pending: hashes.iter().cloned().collect(),
        }
    }

    /// Number of `block` transactions that belong to the run. Matched
    /// hashes are consumed so a transaction is never counted twice.
    fn matches(&mut self, block: &Block) -> usize {
        block
            .txs
            .iter()
            .filter(|raw| self.pending.remove(&TxHash::of(raw)))
            .count()
    }
}

/// `total / (last block time - start)`; elapsed times below one second
/// count as one second.
pub fn calculate_tps(total: usize, start: DateTime<Utc>, last_block: DateTime<Utc>) -> f64 {
    let elapsed = (last_block - start).num_milliseconds() as f64 / 1000.0;
    total as f64 / elapsed.max(1.0)
}

/// Polls the chain until every dispatched transaction has landed in a
/// block, the timeout fires, or the run is cancelled.
pub struct Collector {
    client: Arc<dyn NodeClient>,
    observer: Arc<dyn Observer>,
    cancel: CancellationToken,
    poll_interval: Duration,
    timeout: Duration,
}

impl Collector {
    pub fn new(
        client: Arc<dyn NodeClient>,
        observer: Arc<dyn Observer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            observer,
            cancel,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_COLLECT_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn get_run_result(
        &self,
        tx_hashes: &[TxHash],
        start_height: u64,
        start_time: DateTime<Utc>,
    ) -> Result<RunResult, StressError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut lookup = TxLookup::new(tx_hashes);
        let expected = lookup.pending.len();
        let mut processed = 0;
        let mut cursor = start_height;
        let mut blocks = vec![];

        self.observer
            .phase_started(Phase::Collection, expected as u64);

        while processed < expected {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(StressError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(StressError::CollectorTimeout {
                        processed,
                        expected,
                        elapsed: started.elapsed(),
                    });
                }
                _ = sleep(self.poll_interval) => {}
            }

            let latest = self
                .client
                .get_latest_block_height()
                .await
                .map_err(|e| StressError::client("fetch latest block height", e))?;
            if latest < cursor {
                continue;
            }

            for height in cursor..=latest {
                let block = self
                    .client
                    .get_block(height)
                    .await
                    .map_err(|e| StressError::client(format!("fetch block {height}"), e))?;

                let matched = lookup.matches(&block);
                if matched == 0 {
                    continue;
                }
                processed += matched;
                self.observer.advance(Phase::Collection, matched as u64);

                let gas_used = self
                    .client
                    .get_block_gas_used(height)
                    .await
                    .map_err(|e| StressError::client(format!("fetch gas used of block {height}"), e))?;
                let gas_limit = self
                    .client
                    .get_block_gas_limit(height)
                    .await
                    .map_err(|e| StressError::client(format!("fetch gas limit of block {height}"), e))?;

                debug!(height, matched, processed, "Matched run transactions");
                blocks.push(BlockResult {
                    number: height,
                    time: block.time,
                    transactions: block.num_txs,
                    gas_used,
                    gas_limit,
                });
            }

            cursor = latest + 1;
        }

        self.observer.phase_finished(Phase::Collection);

        let average_tps = blocks
            .last()
            .map(|last| calculate_tps(expected, start_time, last.time))
            .unwrap_or_default();
        info!(average_tps, blocks = blocks.len(), "Collected run results");

        Ok(RunResult {
            average_tps,
            blocks,
        })
    }
}

#[cfg(test)]
#[path = "unit_tests/collector_tests.rs"]
mod collector_tests;
