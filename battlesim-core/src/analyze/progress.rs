//! Progress structures folded from analyzer leaves.
//!
//! Every statistic is a weighted sum; folding is plain addition, so the order
//! in which leaves arrive does not change the result beyond float rounding,
//! and the analyzer always folds in node order to make even that exact.

use crate::battle::{Battle, Outcome};
use crate::defines::analysis::HISTOGRAM_BUCKETS;
use crate::fixed::Fixed;
use crate::metrics::AnalysisMetrics;
use crate::side::{Side, SideKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinRateProgress {
    /// Weight of branches the attacker won
    pub attacker: f64,
    pub defender: f64,
    pub draws: f64,
    /// Weight of branches still fighting at the depth limit, or cancelled
    pub incomplete: f64,
    /// Number of folded leaves
    pub battles: u64,
    /// Weighted mean round at which decided branches ended
    pub average_rounds: f64,
    /// Weight of decided branches that ended in a stack wipe
    pub stack_wipes: f64,
    /// Final round of decided branches, by weight
    pub rounds: BTreeMap<i32, f64>,
    /// Chunks processed
    pub iterations: u64,
    /// Folded weight, 0 to 1
    pub progress: f64,
    pub calculating: bool,
}

/// Remaining morale and strength of one side, as fractions of its totals at
/// the start of the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideCasualties {
    pub average_morale: f64,
    pub average_strength: f64,
    /// Percent bucket to weight
    pub morale: BTreeMap<u32, f64>,
    pub strength: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasualtiesProgress {
    pub attacker: SideCasualties,
    pub defender: SideCasualties,
}

/// Expected cost of a battle for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLosses {
    /// Maintenance needed to refill surviving cohorts
    pub repair_maintenance: f64,
    /// Cost of own cohorts destroyed outright
    pub destroyed_cost: f64,
    /// Cost of own cohorts captured by the enemy
    pub captured_cost: f64,
    /// Cost of enemy cohorts captured by this side
    pub seized_cost: f64,
}

impl ResourceLosses {
    fn add_scaled(&mut self, other: &ResourceLosses, weight: f64) {
        self.repair_maintenance += other.repair_maintenance * weight;
        self.destroyed_cost += other.destroyed_cost * weight;
        self.captured_cost += other.captured_cost * weight;
        self.seized_cost += other.seized_cost * weight;
    }

    fn scaled(&self, factor: f64) -> ResourceLosses {
        let mut out = ResourceLosses::default();
        out.add_scaled(self, factor);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLossesProgress {
    pub attacker: ResourceLosses,
    pub defender: ResourceLosses,
}

/// What a caller sees after each chunk. Sections whose `Calculate*` setting
/// is off are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub win_rate: Option<WinRateProgress>,
    pub casualties: Option<CasualtiesProgress>,
    pub resource_losses: Option<ResourceLossesProgress>,
    pub progress: f64,
    pub iterations: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub snapshot: AnalysisSnapshot,
    /// Stopped before the tree was exhausted; pending weight is incomplete
    pub cancelled: bool,
    pub metrics: AnalysisMetrics,
}

/// Morale and strength of a side including armies that have not arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideTotals {
    pub morale: Fixed,
    pub strength: Fixed,
}

impl SideTotals {
    pub fn of(side: &Side) -> Self {
        let mut totals = SideTotals::default();
        for id in side.cohorts.live_ids() {
            if let Some(cohort) = side.cohorts.get(id) {
                totals.morale += cohort.morale.get();
                totals.strength += cohort.strength.get();
            }
        }
        for (i, army) in side.armies.iter().enumerate() {
            if side.deployed_armies.contains(&i) {
                continue;
            }
            let pools = [&army.reserve.front, &army.reserve.flank, &army.reserve.support];
            for props in pools.into_iter().flatten() {
                totals.morale += props.max_morale;
                totals.strength += props.max_strength;
            }
        }
        totals
    }
}

fn fraction(value: Fixed, start: Fixed) -> f64 {
    if !start.is_positive() {
        return 0.0;
    }
    (value.to_f64() / start.to_f64()).clamp(0.0, 1.0)
}

/// Costs of a side at the end of a branch. Cohorts defeated before the
/// analysis started are ignored.
fn resource_losses(side: &Side, since_round: i32) -> ResourceLosses {
    let mut losses = ResourceLosses::default();
    for id in side.cohorts.live_ids() {
        if let Some(cohort) = side.cohorts.get(id) {
            let missing = 1.0 - cohort.strength.ratio().to_f64();
            losses.repair_maintenance += cohort.properties.maintenance * missing;
        }
    }
    for &id in side.cohorts.defeated() {
        let Some(cohort) = side.cohorts.get(id) else {
            continue;
        };
        if cohort.state.defeated_round.is_some_and(|r| r <= since_round) {
            continue;
        }
        let capture = cohort.state.capture_chance.to_f64();
        losses.destroyed_cost += cohort.properties.cost * (1.0 - capture);
        losses.captured_cost += cohort.properties.cost * capture;
    }
    losses
}

/// Everything a finished branch contributes, extracted from its battle so
/// the battle can be dropped before folding.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub weight: f64,
    /// `None` for incomplete branches
    pub outcome: Option<Outcome>,
    pub round: i32,
    pub stack_wiped: bool,
    /// Remaining `(morale, strength)` fractions per side
    pub remaining: [(f64, f64); 2],
    pub losses: [ResourceLosses; 2],
}

impl Leaf {
    pub fn new(battle: &Battle, weight: f64, start: &[SideTotals; 2], start_round: i32) -> Self {
        let remaining = [SideKind::Attacker, SideKind::Defender].map(|kind| {
            let now = SideTotals::of(battle.side(kind));
            let base = start[kind.index()];
            (fraction(now.morale, base.morale), fraction(now.strength, base.strength))
        });
        let mut losses = [SideKind::Attacker, SideKind::Defender]
            .map(|kind| resource_losses(battle.side(kind), start_round));
        losses[0].seized_cost = losses[1].captured_cost;
        losses[1].seized_cost = losses[0].captured_cost;

        Self {
            weight,
            outcome: battle.outcome,
            round: battle.round,
            stack_wiped: battle.any_stack_wiped(),
            remaining,
            losses,
        }
    }
}

fn bucket(value: f64) -> u32 {
    (value * HISTOGRAM_BUCKETS).round().max(0.0) as u32
}

/// Weighted sums behind the progress structures.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    win_rate: WinRateProgress,
    decided_weight: f64,
    weighted_rounds: f64,
    casualties: CasualtiesProgress,
    losses: ResourceLossesProgress,
    /// Weight of folded leaves
    measured: f64,
    /// Leaves plus abandoned weight
    folded: f64,
}

impl Accumulator {
    pub fn fold(&mut self, leaf: &Leaf) {
        let w = leaf.weight;
        let wr = &mut self.win_rate;
        wr.battles += 1;
        match leaf.outcome {
            Some(outcome) => {
                match outcome {
                    Outcome::AttackerWins => wr.attacker += w,
                    Outcome::DefenderWins => wr.defender += w,
                    Outcome::Draw => wr.draws += w,
                }
                if leaf.stack_wiped {
                    wr.stack_wipes += w;
                }
                *wr.rounds.entry(leaf.round).or_default() += w;
                self.decided_weight += w;
                self.weighted_rounds += w * leaf.round as f64;
            }
            None => wr.incomplete += w,
        }

        for (side, &(morale, strength)) in [&mut self.casualties.attacker, &mut self.casualties.defender]
            .into_iter()
            .zip(leaf.remaining.iter())
        {
            side.average_morale += morale * w;
            side.average_strength += strength * w;
            *side.morale.entry(bucket(morale)).or_default() += w;
            *side.strength.entry(bucket(strength)).or_default() += w;
        }

        self.losses.attacker.add_scaled(&leaf.losses[0], w);
        self.losses.defender.add_scaled(&leaf.losses[1], w);
        self.measured += w;
        self.folded += w;
    }

    /// Count weight that will never be explored as incomplete.
    pub fn abandon(&mut self, weight: f64) {
        self.win_rate.incomplete += weight;
        self.folded += weight;
    }

    pub fn folded(&self) -> f64 {
        self.folded
    }

    pub fn win_rate(&self, iterations: u64, calculating: bool) -> WinRateProgress {
        let mut progress = self.win_rate.clone();
        progress.average_rounds = if self.decided_weight > 0.0 {
            self.weighted_rounds / self.decided_weight
        } else {
            0.0
        };
        progress.iterations = iterations;
        progress.progress = self.folded;
        progress.calculating = calculating;
        progress
    }

    /// Averages are over the weight folded with casualty data, which excludes
    /// abandoned weight.
    pub fn casualties(&self) -> CasualtiesProgress {
        let weight = self.measured;
        let mut progress = self.casualties.clone();
        for side in [&mut progress.attacker, &mut progress.defender] {
            if weight > 0.0 {
                side.average_morale /= weight;
                side.average_strength /= weight;
            }
        }
        progress
    }

    pub fn resource_losses(&self) -> ResourceLossesProgress {
        let weight = self.measured;
        if weight <= 0.0 {
            return ResourceLossesProgress::default();
        }
        ResourceLossesProgress {
            attacker: self.losses.attacker.scaled(1.0 / weight),
            defender: self.losses.defender.scaled(1.0 / weight),
        }
    }
}
