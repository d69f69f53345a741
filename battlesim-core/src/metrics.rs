use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accumulated timing metrics for one analysis run.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub chunks: u64,
    /// Nodes expanded
    pub nodes: u64,
    /// Leaves folded (decided or incomplete)
    pub leaves: u64,
    /// Rounds resolved across all branches
    pub rounds: u64,
    /// Time spent expanding nodes
    pub expand_time: Duration,
    /// Time spent folding leaves and building snapshots
    pub fold_time: Duration,
    /// Wall clock time from the first chunk to the last
    pub wall_time: Duration,
    /// Deepest pending stack seen
    pub peak_pending: usize,
}

impl AnalysisMetrics {
    pub fn chunk_avg_ms(&self) -> f64 {
        if self.chunks == 0 {
            0.0
        } else {
            (self.expand_time + self.fold_time).as_secs_f64() * 1000.0 / self.chunks as f64
        }
    }

    pub fn nodes_per_second(&self) -> f64 {
        let secs = self.expand_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.nodes as f64 / secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_without_samples() {
        let metrics = AnalysisMetrics::default();
        assert_eq!(metrics.chunk_avg_ms(), 0.0);
        assert_eq!(metrics.nodes_per_second(), 0.0);
    }

    #[test]
    fn test_rates() {
        let metrics = AnalysisMetrics {
            chunks: 4,
            nodes: 1000,
            expand_time: Duration::from_millis(300),
            fold_time: Duration::from_millis(100),
            ..Default::default()
        };
        assert!((metrics.chunk_avg_ms() - 100.0).abs() < 1e-9);
        assert!((metrics.nodes_per_second() - 1000.0 / 0.3).abs() < 1e-6);
    }
}
