//! Progress reporting through the `log` facade.

use super::{ObserverError, ProgressObserver};
use crate::analyze::{AnalysisReport, AnalysisSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Logs win rates every `every` chunks and a summary at the end.
pub struct LogObserver {
    every: u64,
    seen: AtomicU64,
}

impl LogObserver {
    pub fn new() -> Self {
        Self {
            every: 1,
            seen: AtomicU64::new(0),
        }
    }

    /// Log only every `every`th snapshot.
    pub fn with_frequency(mut self, every: u64) -> Self {
        self.every = every.max(1);
        self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn percent(value: f64) -> f64 {
    value * 100.0
}

impl ProgressObserver for LogObserver {
    fn on_progress(&self, snapshot: &AnalysisSnapshot) -> Result<(), ObserverError> {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % self.every != 0 {
            return Ok(());
        }
        match &snapshot.win_rate {
            Some(wr) => log::info!(
                "[{:>5.1}%] attacker {:.2}% defender {:.2}% draw {:.2}% incomplete {:.2}% ({} battles)",
                percent(snapshot.progress),
                percent(wr.attacker),
                percent(wr.defender),
                percent(wr.draws),
                percent(wr.incomplete),
                wr.battles
            ),
            None => log::info!("[{:>5.1}%] chunk {}", percent(snapshot.progress), snapshot.iterations),
        }
        Ok(())
    }

    fn on_finish(&self, report: &AnalysisReport) -> Result<(), ObserverError> {
        let metrics = &report.metrics;
        log::info!(
            "Analysis {}: {} chunks, {} nodes, {} rounds in {:.2?} ({:.0} nodes/s)",
            if report.cancelled { "cancelled" } else { "complete" },
            metrics.chunks,
            metrics.nodes,
            metrics.rounds,
            metrics.wall_time,
            metrics.nodes_per_second()
        );
        if let Some(wr) = &report.snapshot.win_rate {
            log::info!(
                "Average length {:.1} rounds, stack wipes {:.2}%",
                wr.average_rounds,
                percent(wr.stack_wipes)
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LogObserver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_gating_never_fails() {
        let observer = LogObserver::new().with_frequency(3);
        for _ in 0..7 {
            assert!(observer.on_progress(&AnalysisSnapshot::default()).is_ok());
        }
        assert_eq!(observer.seen.load(Ordering::Relaxed), 7);
        assert!(observer.on_finish(&AnalysisReport::default()).is_ok());
    }
}
