//! Probability-weighted outcome analyzer.
//!
//! Instead of sampling random battles, the analyzer walks a tree of dice
//! outcomes. Each node is a battle snapshot; expanding it resolves one phase
//! per dice combination and splits the node's weight among the children
//! according to a [`BranchWeighting`]. Decided branches and branches that hit
//! the depth limit become leaves and are folded into running statistics.
//!
//! ```text
//!   pending stack ──pop chunk──▶ expand (rayon if Parallel) ──▶ fold in order
//!        ▲                                                        │
//!        └──────────────────── push children ◀────────────────────┘
//! ```
//!
//! The tree is drained depth-first from an explicit stack, `ChunkSize` nodes
//! at a time. Between chunks the caller gets an [`AnalysisSnapshot`] and may
//! cancel; cancelling counts all pending weight as incomplete, so the
//! outcome buckets still sum to 1.

pub mod node;
pub mod progress;
pub mod weights;

pub use node::{CombatNode, ExpandContext, Expansion};
pub use progress::{
    AnalysisReport, AnalysisSnapshot, CasualtiesProgress, ResourceLosses, ResourceLossesProgress,
    SideCasualties, WinRateProgress,
};
pub use weights::{AllRolls, Branch, BranchWeighting, ReducedRolls};

use crate::battle::Battle;
use crate::config::{CombatSettings, SettingsError};
use crate::metrics::AnalysisMetrics;
use crate::observer::ObserverRegistry;
use crate::profiling::frame_mark_chunk;
use crate::systems::combat::start_battle;
use progress::{Accumulator, SideTotals};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("battle is already over (round {0})")]
    BattleOver(i32),
    #[error("a side has no cohorts and no arriving armies")]
    EmptySide,
    #[error("analysis worker panicked")]
    WorkerPanicked,
}

/// Resumable stepper over the branch tree.
pub struct Analyzer {
    settings: CombatSettings,
    weighting: Box<dyn BranchWeighting>,
    pending: Vec<CombatNode>,
    accumulator: Accumulator,
    start: [SideTotals; 2],
    start_round: i32,
    max_depth: usize,
    phase_length: u32,
    chunk_size: usize,
    iterations: u64,
    cancelled: bool,
    metrics: AnalysisMetrics,
    started_at: Option<Instant>,
}

impl Analyzer {
    /// Prepare an analysis of `battle` from its current round.
    ///
    /// A battle that has not started yet is started first (deployment and
    /// the instant stack wipe check are not random).
    pub fn new(
        mut battle: Battle,
        settings: CombatSettings,
        weighting: Box<dyn BranchWeighting>,
    ) -> Result<Self, AnalysisError> {
        settings.validate()?;
        if battle.attacker.armies.is_empty() || battle.defender.armies.is_empty() {
            return Err(AnalysisError::EmptySide);
        }
        start_battle(&mut battle, &settings);
        if battle.fight_over {
            return Err(AnalysisError::BattleOver(battle.round));
        }

        let start = [
            SideTotals::of(&battle.attacker),
            SideTotals::of(&battle.defender),
        ];
        let start_round = battle.round;
        let max_depth = settings.analysis_depth();
        let phase_length = settings.analysis_phase_length();
        let chunk_size = settings.analysis_chunk_size();
        log::info!(
            "Analysis from round {}: depth {}, {} rounds per phase, chunks of {}, weighting {}",
            start_round,
            max_depth,
            phase_length,
            chunk_size,
            weighting.name()
        );

        let root = CombatNode::root(battle, weighting.as_ref(), &settings);
        Ok(Self {
            settings,
            weighting,
            pending: vec![root],
            accumulator: Accumulator::default(),
            start,
            start_round,
            max_depth,
            phase_length,
            chunk_size,
            iterations: 0,
            cancelled: false,
            metrics: AnalysisMetrics::default(),
            started_at: None,
        })
    }

    /// Analyzer with the default [`ReducedRolls`] weighting.
    pub fn with_default_weighting(
        battle: Battle,
        settings: CombatSettings,
    ) -> Result<Self, AnalysisError> {
        Self::new(battle, settings, Box::new(ReducedRolls))
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn settings(&self) -> &CombatSettings {
        &self.settings
    }

    /// Expand up to `ChunkSize` pending nodes and fold the results.
    pub fn step(&mut self) -> AnalysisSnapshot {
        if self.is_done() {
            return self.snapshot();
        }
        let started = *self.started_at.get_or_insert_with(Instant::now);
        let take = self.chunk_size.min(self.pending.len());
        let _span = tracing::info_span!("analysis_chunk", nodes = take).entered();

        // Top of the stack, kept in stack order so children end up in the
        // same place regardless of evaluation strategy
        let chunk = self.pending.split_off(self.pending.len() - take);

        let expand_start = Instant::now();
        let ctx = ExpandContext {
            settings: &self.settings,
            weighting: self.weighting.as_ref(),
            max_depth: self.max_depth,
            phase_length: self.phase_length,
            start: self.start,
            start_round: self.start_round,
        };
        let expansions: Vec<Expansion> = if self.settings.parallel {
            chunk.par_iter().map(|node| node::expand(node, &ctx)).collect()
        } else {
            chunk.iter().map(|node| node::expand(node, &ctx)).collect()
        };
        self.metrics.expand_time += expand_start.elapsed();

        let fold_start = Instant::now();
        for expansion in expansions {
            self.metrics.nodes += 1;
            self.metrics.rounds += expansion.rounds;
            self.metrics.leaves += expansion.leaves.len() as u64;
            for leaf in &expansion.leaves {
                self.accumulator.fold(leaf);
            }
            // Reversed so the first branch is expanded first
            self.pending.extend(expansion.children.into_iter().rev());
        }
        self.metrics.peak_pending = self.metrics.peak_pending.max(self.pending.len());
        self.iterations += 1;
        self.metrics.chunks = self.iterations;

        let snapshot = self.snapshot();
        self.metrics.fold_time += fold_start.elapsed();
        self.metrics.wall_time = started.elapsed();
        frame_mark_chunk();

        log::debug!(
            "Chunk {}: {} nodes, {} pending, progress {:.4}",
            self.iterations,
            take,
            self.pending.len(),
            snapshot.progress
        );
        if self.is_done() {
            log::info!(
                "Analysis finished after {} chunks, {} leaves",
                self.iterations,
                self.metrics.leaves
            );
        }
        snapshot
    }

    /// Stop exploring: pending weight becomes incomplete.
    pub fn cancel(&mut self) -> AnalysisReport {
        let abandoned: f64 = self.pending.drain(..).map(|node| node.weight).sum();
        if abandoned > 0.0 {
            self.accumulator.abandon(abandoned);
            self.cancelled = true;
            log::info!(
                "Analysis cancelled after {} chunks, {:.4} weight incomplete",
                self.iterations,
                abandoned
            );
        }
        self.report()
    }

    /// Step until the tree is exhausted.
    pub fn run_to_completion(&mut self) -> AnalysisReport {
        while !self.is_done() {
            self.step();
        }
        self.report()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        let calculating = !self.is_done();
        AnalysisSnapshot {
            win_rate: self
                .settings
                .calculate_win_chance
                .then(|| self.accumulator.win_rate(self.iterations, calculating)),
            casualties: self
                .settings
                .calculate_casualties
                .then(|| self.accumulator.casualties()),
            resource_losses: self
                .settings
                .calculate_resource_losses
                .then(|| self.accumulator.resource_losses()),
            progress: self.accumulator.folded(),
            iterations: self.iterations,
        }
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            snapshot: self.snapshot(),
            cancelled: self.cancelled,
            metrics: self.metrics.clone(),
        }
    }
}

/// Running analysis on a worker thread.
pub struct AnalysisHandle {
    progress: Receiver<AnalysisSnapshot>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<AnalysisReport>,
}

impl AnalysisHandle {
    /// Snapshots, one per chunk. Disconnects when the worker finishes.
    pub fn progress(&self) -> &Receiver<AnalysisSnapshot> {
        &self.progress
    }

    /// Ask the worker to stop at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<AnalysisReport, AnalysisError> {
        self.worker.join().map_err(|_| AnalysisError::WorkerPanicked)
    }
}

/// Validate and start an analysis on a background thread.
///
/// Snapshots are sent to the handle's channel and to every registered
/// observer after each chunk. Observers are shut down when the worker ends.
pub fn start_analysis(
    battle: Battle,
    settings: CombatSettings,
    weighting: Box<dyn BranchWeighting>,
    observers: ObserverRegistry,
) -> Result<AnalysisHandle, AnalysisError> {
    let mut analyzer = Analyzer::new(battle, settings, weighting)?;
    let (sender, progress) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let worker = std::thread::spawn(move || {
        let report = loop {
            if flag.load(Ordering::Relaxed) {
                break analyzer.cancel();
            }
            let snapshot = analyzer.step();
            observers.notify(&snapshot);
            // The receiver may have been dropped; keep going regardless
            let _ = sender.send(snapshot);
            if analyzer.is_done() {
                break analyzer.report();
            }
        };
        observers.finish(&report);
        report
    });

    Ok(AnalysisHandle {
        progress,
        cancel,
        worker,
    })
}
