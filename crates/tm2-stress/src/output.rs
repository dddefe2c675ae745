// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use prettytable::{format, row, Table};

use crate::collector::{BlockResult, RunResult};

fn table_format() -> format::TableFormat {
    format::FormatBuilder::new()
        .separators(
            &[
                format::LinePosition::Top,
                format::LinePosition::Bottom,
                format::LinePosition::Title,
            ],
            format::LineSeparator::new('-', '-', '-', '-'),
        )
        .padding(1, 1)
        .build()
}

/// Share of the block gas limit used, in percent
pub fn utilization(block: &BlockResult) -> f64 {
    if block.gas_limit == 0 {
        return 0.0;
    }
    block.gas_used as f64 / block.gas_limit as f64 * 100.0
}

pub fn results_table(result: &RunResult) -> Table {
    let mut table = Table::new();
    table.set_format(table_format());
    table.set_titles(row![bH5->format!("TPS: {:.2}", result.average_tps)]);
    table.add_row(row![b->"Block #", b->"Gas Used", b->"Gas Limit", b->"Transactions", b->"Utilization"]);
    for block in &result.blocks {
        table.add_row(row![
            format!("Block #{}", block.number),
            block.gas_used,
            block.gas_limit,
            block.transactions,
            format!("{:.2}%", utilization(block)),
        ]);
    }
    table
}

pub fn display_results(result: &RunResult) {
    println!("\n{}", "Run results".green().bold());
    results_table(result).printstd();
    println!();
}

pub fn save_results(result: &RunResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("unable to serialize run result")?;
    fs::write(path, json)
        .with_context(|| format!("unable to write run result to {}", path.display()))
}
