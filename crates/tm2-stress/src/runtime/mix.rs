// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::RuntimeType;
use crate::error::MixRatioError;

/// Share of the run given to one runtime type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixRatio {
    pub runtime_type: RuntimeType,
    pub percentage: u32,
}

/// A validated traffic mix: at least two distinct mixable types whose
/// percentages sum to 100, kept in the order they were given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixConfig {
    ratios: Vec<MixRatio>,
}

impl MixConfig {
    pub fn new(ratios: Vec<MixRatio>) -> Result<Self, MixRatioError> {
        let mut seen = BTreeSet::new();
        for ratio in &ratios {
            if !ratio.runtime_type.is_mixable() {
                return Err(MixRatioError::MixedInMix);
            }
            if !(1..=100).contains(&ratio.percentage) {
                return Err(MixRatioError::InvalidPercentage(ratio.percentage.to_string()));
            }
            if !seen.insert(ratio.runtime_type) {
                return Err(MixRatioError::DuplicateType(ratio.runtime_type));
            }
        }

        if ratios.len() < 2 {
            return Err(MixRatioError::InsufficientTypes);
        }
        let sum: u32 = ratios.iter().map(|r| r.percentage).sum();
        if sum != 100 {
            return Err(MixRatioError::InvalidSum(sum));
        }

        Ok(Self { ratios })
    }

    /// Parses `TYPE:PCT,TYPE:PCT,...`, e.g.
    /// `REALM_CALL:70,REALM_DEPLOYMENT:20,PACKAGE_DEPLOYMENT:10`
    pub fn parse(input: &str) -> Result<Self, MixRatioError> {
        if input.trim().is_empty() {
            return Err(MixRatioError::Empty);
        }

        let ratios = input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_ratio)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(ratios)
    }

    pub fn ratios(&self) -> &[MixRatio] {
        &self.ratios
    }

    pub fn has_type(&self, runtime_type: RuntimeType) -> bool {
        self.ratios.iter().any(|r| r.runtime_type == runtime_type)
    }

    /// Splits `total` across the configured types. Every type but the
    /// last gets `floor(total * pct / 100)`; the last type takes the
    /// remainder, so the counts always add up to `total`.
    pub fn calculate_counts(&self, total: u64) -> Vec<(RuntimeType, u64)> {
        let mut allocated = 0u64;
        let last = self.ratios.len().saturating_sub(1);

        self.ratios
            .iter()
            .enumerate()
            .map(|(i, ratio)| {
                let count = if i == last {
                    total - allocated
                } else {
                    let share = u128::from(total) * u128::from(ratio.percentage) / 100;
                    share as u64
                };
                allocated += count;
                (ratio.runtime_type, count)
            })
            .collect()
    }
}

fn parse_ratio(part: &str) -> Result<MixRatio, MixRatioError> {
    let (name, percentage) = part
        .rsplit_once(':')
        .ok_or_else(|| MixRatioError::InvalidFormat(part.to_string()))?;
    let (name, percentage) = (name.trim(), percentage.trim());

    let percentage = percentage
        .parse::<u32>()
        .ok()
        .filter(|p| (1..=100).contains(p))
        .ok_or_else(|| MixRatioError::InvalidPercentage(percentage.to_string()))?;

    let runtime_type = RuntimeType::from_str(name)
        .map_err(|_| MixRatioError::UnknownType(name.to_string()))?;
    if !runtime_type.is_mixable() {
        return Err(MixRatioError::MixedInMix);
    }

    Ok(MixRatio {
        runtime_type,
        percentage,
    })
}

impl FromStr for MixConfig {
    type Err = MixRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ratio) in self.ratios.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", ratio.runtime_type, ratio.percentage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../unit_tests/mix_tests.rs"]
mod mix_tests;
