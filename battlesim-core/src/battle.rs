use crate::side::{Side, SideKind};
use crate::unit::{Tactic, Terrain};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    AttackerWins,
    DefenderWins,
    /// Both sides went out in the same round
    Draw,
}

/// Top-level aggregate: two sides plus the battle's environment.
///
/// Cloning is cheap (cohort arenas are `im::Vector`, terrain and tactics are
/// shared), which is what the analyzer relies on for copy-on-branch.
#[derive(Debug, Clone)]
pub struct Battle {
    pub attacker: Side,
    pub defender: Side,
    pub terrains: Arc<[Terrain]>,
    pub tactics: Arc<[Tactic]>,
    /// -1 until the first round is resolved
    pub round: i32,
    pub fight_over: bool,
    pub seed: u64,
    pub outcome: Option<Outcome>,
}

impl Battle {
    pub fn new(
        attacker: Side,
        defender: Side,
        terrains: &[Terrain],
        tactics: &[Tactic],
        seed: u64,
    ) -> Self {
        Self {
            attacker,
            defender,
            terrains: terrains.into(),
            tactics: tactics.into(),
            round: -1,
            fight_over: false,
            seed,
            outcome: None,
        }
    }

    pub fn side(&self, kind: SideKind) -> &Side {
        match kind {
            SideKind::Attacker => &self.attacker,
            SideKind::Defender => &self.defender,
        }
    }

    pub fn side_mut(&mut self, kind: SideKind) -> &mut Side {
        match kind {
            SideKind::Attacker => &mut self.attacker,
            SideKind::Defender => &mut self.defender,
        }
    }

    /// `(own, enemy)` for the given side.
    pub fn sides_mut(&mut self, kind: SideKind) -> (&mut Side, &mut Side) {
        match kind {
            SideKind::Attacker => (&mut self.attacker, &mut self.defender),
            SideKind::Defender => (&mut self.defender, &mut self.attacker),
        }
    }

    pub fn is_started(&self) -> bool {
        self.round >= 0
    }

    pub fn width(&self) -> usize {
        self.attacker.cohorts.width()
    }

    /// Sum of terrain roll modifiers.
    pub fn terrain_roll(&self) -> i32 {
        self.terrains.iter().map(|t| t.roll).sum()
    }

    pub fn tactic(&self, name: Option<&str>) -> Option<&Tactic> {
        let name = name?;
        self.tactics.iter().find(|t| t.name == name)
    }

    /// End the battle if a side is out. Returns true if the fight is over.
    pub fn update_outcome(&mut self) -> bool {
        if self.fight_over {
            return true;
        }
        let outcome = match (self.attacker.alive, self.defender.alive) {
            (true, true) => return false,
            (true, false) => Outcome::AttackerWins,
            (false, true) => Outcome::DefenderWins,
            (false, false) => Outcome::Draw,
        };
        self.fight_over = true;
        self.outcome = Some(outcome);
        log::info!("Battle over after round {}: {:?}", self.round, outcome);
        true
    }

    /// A stack wipe ended the battle for at least one side.
    pub fn any_stack_wiped(&self) -> bool {
        self.attacker.stack_wiped || self.defender.stack_wiped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BattleBuilder;

    #[test]
    fn test_new_battle_not_started() {
        let battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .build();
        assert_eq!(battle.round, -1);
        assert!(!battle.is_started());
        assert!(!battle.fight_over);
        assert_eq!(battle.outcome, None);
        assert_eq!(battle.width(), 30);
    }

    #[test]
    fn test_update_outcome() {
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .build();
        assert!(!battle.update_outcome());

        battle.defender.alive = false;
        assert!(battle.update_outcome());
        assert_eq!(battle.outcome, Some(Outcome::AttackerWins));

        // Outcome is fixed once decided
        battle.attacker.alive = false;
        battle.update_outcome();
        assert_eq!(battle.outcome, Some(Outcome::AttackerWins));
    }

    #[test]
    fn test_draw_when_both_out() {
        let mut battle = BattleBuilder::new().build();
        battle.attacker.alive = false;
        battle.defender.alive = false;
        battle.update_outcome();
        assert_eq!(battle.outcome, Some(Outcome::Draw));
    }

    #[test]
    fn test_tactic_lookup() {
        let battle = BattleBuilder::new()
            .tactic(Tactic {
                name: "skirmishing".to_string(),
                ..Default::default()
            })
            .build();
        assert!(battle.tactic(Some("skirmishing")).is_some());
        assert!(battle.tactic(Some("phalanx")).is_none());
        assert!(battle.tactic(None).is_none());
    }
}
