// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::collector::{DEFAULT_COLLECT_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::error::{ConfigError, StressError};
use crate::keys::is_valid_mnemonic;
use crate::runtime::{MixConfig, RuntimeType};

/// Upper bound on `--transactions`; every transaction is signed and held
/// in memory before dispatch
pub const MAX_TRANSACTIONS: u64 = 10_000_000;

#[derive(Parser, Debug)]
#[command(author = "build@mystenlabs.com", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Starts the stress testing suite against a Gno TM2 cluster
    Stress(Config),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The JSON-RPC URL of the cluster
    #[arg(long)]
    pub url: String,

    /// The chain ID of the Gno blockchain
    #[arg(long, default_value = "dev")]
    pub chain_id: String,

    /// The mnemonic used to generate sub-accounts
    #[arg(long)]
    pub mnemonic: String,

    /// The mode for the stress test: REALM_DEPLOYMENT, PACKAGE_DEPLOYMENT,
    /// REALM_CALL or MIXED
    #[arg(long, default_value = "REALM_DEPLOYMENT")]
    pub mode: String,

    /// Traffic mix for MIXED mode, e.g. REALM_CALL:70,REALM_DEPLOYMENT:30
    #[arg(long)]
    pub mix_ratio: Option<String>,

    /// The number of sub-accounts that will send out transactions
    #[arg(long, default_value_t = 10)]
    pub sub_accounts: u32,

    /// The total number of transactions to be emitted
    #[arg(long, default_value_t = 100)]
    pub transactions: u64,

    /// The batch size of JSON-RPC transactions
    #[arg(long, default_value_t = 20)]
    pub batch: usize,

    /// The output path for the results JSON
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for the mixed traffic shuffle, random when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// How often the collector polls for new blocks
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    pub poll_interval: Duration,

    /// How long the collector waits for every transaction to land
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5m")]
    pub collect_timeout: Duration,

    /// Log progress instead of drawing progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// The traffic profile selected by a validated configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunMode {
    pub runtime_type: RuntimeType,
    pub mix: Option<MixConfig>,
}

impl Config {
    pub fn new(url: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            chain_id: "dev".to_string(),
            mnemonic: mnemonic.into(),
            mode: RuntimeType::RealmDeployment.to_string(),
            mix_ratio: None,
            sub_accounts: 10,
            transactions: 100,
            batch: 20,
            output: None,
            seed: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            no_progress: false,
        }
    }

    /// Checks everything that can be checked without touching the network
    pub fn validate(&self) -> Result<RunMode, StressError> {
        let url = Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl(self.url.clone()))?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::InvalidUrl(self.url.clone()).into());
        }

        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::InvalidChainId.into());
        }

        if !is_valid_mnemonic(&self.mnemonic) {
            return Err(ConfigError::InvalidMnemonic.into());
        }

        let runtime_type = RuntimeType::from_str(self.mode.trim())
            .map_err(|_| ConfigError::InvalidMode(self.mode.clone()))?;

        if self.sub_accounts < 1 {
            return Err(ConfigError::InvalidSubAccounts.into());
        }
        if self.transactions < 1 {
            return Err(ConfigError::InvalidTransactions.into());
        }
        if self.transactions > MAX_TRANSACTIONS {
            return Err(ConfigError::TooManyTransactions(self.transactions).into());
        }
        if self.batch < 1 {
            return Err(ConfigError::InvalidBatchSize.into());
        }

        let mix = match (runtime_type, &self.mix_ratio) {
            (RuntimeType::Mixed, Some(ratio)) => Some(MixConfig::parse(ratio)?),
            (RuntimeType::Mixed, None) => return Err(ConfigError::MissingMixRatio.into()),
            (_, Some(_)) => return Err(ConfigError::UnexpectedMixRatio(runtime_type).into()),
            (_, None) => None,
        };

        Ok(RunMode { runtime_type, mix })
    }
}

#[cfg(test)]
#[path = "unit_tests/config_tests.rs"]
mod config_tests;
