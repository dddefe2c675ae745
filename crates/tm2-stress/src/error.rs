// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use thiserror::Error;

use crate::client::ClientError;
use crate::runtime::RuntimeType;
use crate::types::Coin;

#[derive(Error, Debug)]
pub enum StressError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid mix ratio: {0}")]
    MixRatio(#[from] MixRatioError),

    #[error("Unable to estimate gas for {context}: {source}")]
    Estimation {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to sign transaction: {0}")]
    Signing(String),

    #[error("Insufficient funds: funder holds {balance}, the smallest top-up needs {required}")]
    InsufficientFunds { balance: Coin, required: Coin },

    #[error("Unable to broadcast {target}: {reason}")]
    Broadcast { target: String, reason: String },

    #[error(
        "Collector timed out after {elapsed:?}, matched {processed} of {expected} transactions"
    )]
    CollectorTimeout {
        processed: usize,
        expected: usize,
        elapsed: Duration,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Unable to {action}: {source}")]
    Client {
        action: String,
        #[source]
        source: ClientError,
    },

    #[error("Mismatched signing keys ({keys}) and accounts ({accounts})")]
    AccountMismatch { keys: usize, accounts: usize },

    #[error("Unable to encode transaction: {0}")]
    Encoding(String),

    #[error("Runtime {0} must be initialized before use")]
    NotInitialized(RuntimeType),
}

impl StressError {
    pub(crate) fn client(action: impl Into<String>, source: ClientError) -> Self {
        StressError::Client {
            action: action.into(),
            source,
        }
    }

    pub(crate) fn estimation(context: impl Into<String>, source: ClientError) -> Self {
        StressError::Estimation {
            context: context.into(),
            source,
        }
    }
}

impl From<bcs::Error> for StressError {
    fn from(e: bcs::Error) -> Self {
        StressError::Encoding(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid node URL `{0}`")]
    InvalidUrl(String),

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("invalid mode `{0}`")]
    InvalidMode(String),

    #[error("invalid number of sub-accounts, must be at least 1")]
    InvalidSubAccounts,

    #[error("invalid number of transactions, must be at least 1")]
    InvalidTransactions,

    #[error(
        "too many transactions ({0}), at most {max} per run",
        max = crate::config::MAX_TRANSACTIONS
    )]
    TooManyTransactions(u64),

    #[error("invalid batch size, must be at least 1")]
    InvalidBatchSize,

    #[error("invalid chain ID")]
    InvalidChainId,

    #[error("mode MIXED requires --mix-ratio")]
    MissingMixRatio,

    #[error("--mix-ratio is only valid with mode MIXED, got {0}")]
    UnexpectedMixRatio(RuntimeType),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MixRatioError {
    #[error("mix ratio cannot be empty")]
    Empty,

    #[error("invalid mix ratio format `{0}`, expected TYPE:PERCENTAGE")]
    InvalidFormat(String),

    #[error("invalid percentage `{0}`, must be between 1 and 100")]
    InvalidPercentage(String),

    #[error("unknown runtime type `{0}`")]
    UnknownType(String),

    #[error("duplicate runtime type {0}")]
    DuplicateType(RuntimeType),

    #[error("MIXED cannot be part of a mix ratio")]
    MixedInMix,

    #[error("percentages must sum to 100, got {0}")]
    InvalidSum(u32),

    #[error("mix ratio needs at least 2 runtime types")]
    InsufficientTypes,
}
