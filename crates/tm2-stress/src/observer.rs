// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use strum_macros::{Display, EnumIter};
use tracing::info;

/// Checkpoints of a stress run, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Phase {
    #[strum(serialize = "generating accounts")]
    Accounts,
    #[strum(serialize = "predeploying")]
    Predeploy,
    #[strum(serialize = "estimating gas")]
    Estimation,
    #[strum(serialize = "distributing funds")]
    Distribution,
    #[strum(serialize = "constructing transactions")]
    Construction,
    #[strum(serialize = "batching transactions")]
    Batching,
    #[strum(serialize = "collecting results")]
    Collection,
}

/// Receives progress reports from the pipeline. Implementations must not
/// influence the run, they only report on it.
pub trait Observer: Send + Sync {
    fn phase_started(&self, phase: Phase, total: u64);

    fn advance(&self, phase: Phase, n: u64);

    fn phase_finished(&self, phase: Phase);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn phase_started(&self, _phase: Phase, _total: u64) {}

    fn advance(&self, _phase: Phase, _n: u64) {}

    fn phase_finished(&self, _phase: Phase) {}
}

/// Reports phase boundaries through `tracing` only
#[derive(Debug, Default)]
pub struct LogObserver {
    progress: Mutex<HashMap<Phase, (u64, u64)>>,
}

impl Observer for LogObserver {
    fn phase_started(&self, phase: Phase, total: u64) {
        self.progress.lock().insert(phase, (0, total));
        info!(total, "Started {phase}");
    }

    fn advance(&self, phase: Phase, n: u64) {
        if let Some((done, _)) = self.progress.lock().get_mut(&phase) {
            *done += n;
        }
    }

    fn phase_finished(&self, phase: Phase) {
        let (done, total) = self
            .progress
            .lock()
            .remove(&phase)
            .unwrap_or_default();
        info!(done, total, "Finished {phase}");
    }
}

/// One progress bar per phase on the terminal
#[derive(Default)]
pub struct ProgressObserver {
    bars: Mutex<HashMap<Phase, ProgressBar>>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for ProgressObserver {
    fn phase_started(&self, phase: Phase, total: u64) {
        let bar = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("[{elapsed_precise}] {wide_bar} {pos}/{len} ({msg})")
        {
            bar.set_style(style);
        }
        bar.set_message(phase.to_string());
        self.bars.lock().insert(phase, bar);
    }

    fn advance(&self, phase: Phase, n: u64) {
        if let Some(bar) = self.bars.lock().get(&phase) {
            bar.inc(n);
        }
    }

    fn phase_finished(&self, phase: Phase) {
        if let Some(bar) = self.bars.lock().remove(&phase) {
            bar.finish_with_message(format!("done {phase}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn log_observer_tracks_every_phase() {
        let observer = LogObserver::default();
        for phase in Phase::iter() {
            observer.phase_started(phase, 3);
            observer.advance(phase, 2);
            assert_eq!(observer.progress.lock().get(&phase), Some(&(2, 3)));
            observer.phase_finished(phase);
        }
        assert!(observer.progress.lock().is_empty());
    }
}
