// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    FmtSubscriber,
};

use tm2_stress::client::HttpNodeClient;
use tm2_stress::config::{Cli, Command, Config};
use tm2_stress::observer::{LogObserver, Observer, ProgressObserver};
use tm2_stress::output::{display_results, save_results};
use tm2_stress::pipeline::Pipeline;
use tm2_stress::StressError;

async fn stress(config: Config) -> Result<()> {
    // Catch malformed input before touching the network
    config.validate()?;

    let client = Arc::new(HttpNodeClient::new(&config.url)?);
    let observer: Arc<dyn Observer> = if config.no_progress {
        Arc::new(LogObserver::default())
    } else {
        Arc::new(ProgressObserver::new())
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the run");
            ctrl_c.cancel();
        }
    });

    let output = config.output.clone();
    let pipeline = Pipeline::new(config, client, observer, cancel.clone());
    // Dropping the run mid-phase stops any further funding or dispatch
    let result = tokio::select! {
        result = pipeline.execute() => result?,
        _ = cancel.cancelled() => return Err(StressError::Cancelled.into()),
    };

    display_results(&result);
    if let Some(path) = output {
        save_results(&result, &path)?;
        info!("Results saved to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to install the log subscriber: {e}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Stress(config) => stress(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
