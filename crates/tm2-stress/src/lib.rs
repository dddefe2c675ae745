// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod batcher;
pub mod client;
pub mod collector;
pub mod config;
pub mod distributor;
mod error;
pub mod keys;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod runtime;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{ConfigError, MixRatioError, StressError};
