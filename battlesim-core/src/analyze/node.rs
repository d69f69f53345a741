use super::progress::{Leaf, SideTotals};
use super::weights::BranchWeighting;
use crate::battle::Battle;
use crate::config::CombatSettings;
use crate::systems::combat::advance_round;
use crate::unit::DiceSource;

/// One pending state of the branch tree.
#[derive(Debug, Clone)]
pub struct CombatNode {
    pub battle: Battle,
    /// Index of the branch (dice combination) that produced this node
    pub branch: usize,
    /// Phases resolved since the analysis started
    pub depth: usize,
    pub round: i32,
    /// Branch table row used for this node's children
    pub weight_index: usize,
    /// Probability mass of this node
    pub weight: f64,
}

impl CombatNode {
    pub fn root(battle: Battle, weighting: &dyn BranchWeighting, settings: &CombatSettings) -> Self {
        Self {
            round: battle.round,
            battle,
            branch: 0,
            depth: 0,
            weight_index: weighting.weight_index(0, settings),
            weight: 1.0,
        }
    }
}

/// Fixed inputs shared by every node of one analysis.
pub struct ExpandContext<'a> {
    pub settings: &'a CombatSettings,
    pub weighting: &'a dyn BranchWeighting,
    pub max_depth: usize,
    pub phase_length: u32,
    pub start: [SideTotals; 2],
    pub start_round: i32,
}

/// Result of expanding one node: finished branches and nodes to push.
#[derive(Debug, Default)]
pub struct Expansion {
    pub leaves: Vec<Leaf>,
    pub children: Vec<CombatNode>,
    pub rounds: u64,
}

/// Round at which a branch started at `round` ends. A battle caught in the
/// middle of a dice phase branches only over the rest of that phase.
fn branch_end(round: i32, phase_length: u32, roll_frequency: u32) -> i32 {
    let frequency = roll_frequency.max(1) as i32;
    match round.rem_euclid(frequency) {
        0 => round + phase_length as i32,
        into_phase => round + frequency - into_phase,
    }
}

/// Resolve one phase for every branch of `node`.
///
/// Each child owns a clone of the parent battle; `im`-backed arenas make
/// that clone cheap and keep siblings from aliasing each other.
pub fn expand(node: &CombatNode, ctx: &ExpandContext<'_>) -> Expansion {
    let mut expansion = Expansion::default();
    let depth = node.depth + 1;
    let branches = ctx.weighting.branches(node.weight_index, ctx.settings);

    for (index, branch) in branches.iter().enumerate() {
        let weight = node.weight * branch.fraction;
        let mut battle = node.battle.clone();
        battle.attacker.dice = DiceSource::Fixed(branch.attacker_roll);
        battle.defender.dice = DiceSource::Fixed(branch.defender_roll);

        let target = branch_end(battle.round, ctx.phase_length, ctx.settings.roll_frequency);
        while battle.round < target && advance_round(&mut battle, ctx.settings) {
            expansion.rounds += 1;
        }

        if battle.fight_over || depth >= ctx.max_depth {
            expansion
                .leaves
                .push(Leaf::new(&battle, weight, &ctx.start, ctx.start_round));
            continue;
        }
        expansion.children.push(CombatNode {
            round: battle.round,
            battle,
            branch: index,
            depth,
            weight_index: ctx.weighting.weight_index(depth, ctx.settings),
            weight,
        });
    }
    expansion
}
