//! Stack wipe: battle-ending collapse of a heavily outnumbered side.
//!
//! Without it a side reduced to a sliver of strength stays formally alive
//! and drags the battle out. The hard limit applies at any time, the soft
//! limit during the opening rounds. A side still waiting for one of its
//! armies to arrive is never wiped.

use crate::config::CombatSettings;
use crate::fixed::Fixed;
use crate::side::Side;

/// Which sides a check wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackWipeResult {
    pub attacker: bool,
    pub defender: bool,
}

impl StackWipeResult {
    pub fn any(&self) -> bool {
        self.attacker || self.defender
    }
}

/// Sum of strength over frontline and reserve cohorts. Unless
/// `exclude_defeated`, defeated cohorts add the strength they routed with.
pub fn total_strength(side: &Side, exclude_defeated: bool) -> Fixed {
    let live: Fixed = side
        .cohorts
        .live_ids()
        .into_iter()
        .filter_map(|id| side.cohorts.get(id))
        .map(|c| c.strength.get())
        .sum();
    if exclude_defeated {
        return live;
    }
    let defeated: Fixed = side
        .cohorts
        .defeated()
        .iter()
        .filter_map(|&id| side.cohorts.get(id))
        .map(|c| c.state.routed_strength)
        .sum();
    live + defeated
}

/// `strong / weak > limit`. Zero `weak` counts as an infinite ratio unless
/// `strong` is zero too.
fn ratio_exceeds(strong: Fixed, weak: Fixed, limit: f64) -> bool {
    if !weak.is_positive() {
        return strong.is_positive();
    }
    strong / weak > Fixed::from_f64(limit)
}

fn wipe_candidate(side: &Side) -> bool {
    side.alive && side.all_deployed()
}

/// Terminal transform of a side. Idempotent.
///
/// `by` is the enemy army credited with the wipe.
pub fn stack_wipe(side: &mut Side, by: Option<usize>, round: i32) {
    if !side.stack_wiped {
        log::info!("Round {}: {} stack wiped", round, side.kind);
    }
    side.alive = false;
    side.stack_wiped = true;
    side.generals.clear();
    side.deployed_armies.clear();

    for id in side.cohorts.live_ids() {
        if side.cohorts.defeat(id, round) {
            if let Some(cohort) = side.cohorts.get_mut(id) {
                cohort.state.stack_wiped_by = by;
            }
        }
    }
    side.cohorts.zero_defeated();
}

/// Whether `side` should be wiped by `enemy` under the soft or hard limit.
///
/// Compares the enemy's live strength with what `side` still has, counting
/// the strength its routed cohorts left the field with.
pub fn should_stack_wipe(side: &Side, enemy: &Side, settings: &CombatSettings, soft: bool) -> bool {
    if !wipe_candidate(side) {
        return false;
    }
    let limit = if soft {
        settings.soft_stack_wipe_limit
    } else {
        settings.hard_stack_wipe_limit
    };
    ratio_exceeds(total_strength(enemy, true), total_strength(side, false), limit)
}

/// Wipe `side` (never `enemy`) if the enemy-to-self ratio exceeds the limit.
pub fn check_stack_wipe(
    side: &mut Side,
    enemy: &Side,
    settings: &CombatSettings,
    soft: bool,
    round: i32,
) -> bool {
    if !should_stack_wipe(side, enemy, settings, soft) {
        return false;
    }
    stack_wipe(side, enemy.leading_army(), round);
    true
}

/// Hard-limit check on live totals, typically before the first round.
///
/// A side that is already out (but did not retreat) is wiped as well.
pub fn check_instant_stack_wipe(
    attacker: &mut Side,
    defender: &mut Side,
    settings: &CombatSettings,
    round: i32,
) -> StackWipeResult {
    let attacker_strength = total_strength(attacker, true);
    let defender_strength = total_strength(defender, true);
    let limit = settings.hard_stack_wipe_limit;

    let out = |side: &Side| !side.alive && !side.retreated && !side.stack_wiped;
    let result = StackWipeResult {
        defender: out(defender)
            || (wipe_candidate(defender) && ratio_exceeds(attacker_strength, defender_strength, limit)),
        attacker: out(attacker)
            || (wipe_candidate(attacker) && ratio_exceeds(defender_strength, attacker_strength, limit)),
    };

    if result.defender {
        stack_wipe(defender, attacker.leading_army(), round);
    }
    if result.attacker {
        stack_wipe(attacker, defender.leading_army(), round);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::deploy_arrivals;
    use crate::side::SideKind;
    use crate::systems::reinforcement::reinforce;
    use crate::testing::{BattleBuilder, UnitBuilder};

    /// Attacker of 100 strength, defender of 1.
    fn lopsided() -> crate::battle::Battle {
        let mut battle = BattleBuilder::new()
            .unit(UnitBuilder::new("legion").max_strength(100.0).build())
            .attacker_reserve(&["legion"])
            .defender_reserve(&["infantry"])
            .build();
        for kind in [SideKind::Attacker, SideKind::Defender] {
            let side = battle.side_mut(kind);
            deploy_arrivals(side, 0);
            reinforce(side, false);
        }
        battle
    }

    #[test]
    fn test_total_strength() {
        let battle = lopsided();
        assert_eq!(total_strength(&battle.attacker, true), Fixed::from_int(100));
        assert_eq!(total_strength(&battle.defender, false), Fixed::ONE);
    }

    #[test]
    fn test_hard_limit_wipes_weaker_side_only() {
        let mut battle = lopsided();
        let settings = CombatSettings {
            hard_stack_wipe_limit: 10.0,
            ..Default::default()
        };
        let (attacker, defender) = battle.sides_mut(SideKind::Attacker);
        let result = check_instant_stack_wipe(attacker, defender, &settings, 0);

        assert_eq!(
            result,
            StackWipeResult {
                attacker: false,
                defender: true
            }
        );
        assert!(!battle.defender.alive);
        assert!(battle.defender.stack_wiped);
        assert!(battle.attacker.alive);
        assert_eq!(total_strength(&battle.attacker, true), Fixed::from_int(100));
        assert_eq!(total_strength(&battle.defender, false), Fixed::ZERO);
    }

    #[test]
    fn test_below_limit_no_wipe() {
        let mut battle = lopsided();
        let settings = CombatSettings {
            hard_stack_wipe_limit: 200.0,
            soft_stack_wipe_limit: 2.0,
            ..Default::default()
        };
        let (attacker, defender) = battle.sides_mut(SideKind::Attacker);
        assert!(!check_instant_stack_wipe(attacker, defender, &settings, 0).any());
        assert!(battle.defender.alive);
    }

    #[test]
    fn test_empty_side_is_wiped() {
        let mut battle = BattleBuilder::new().attacker_reserve(&["infantry"]).build();
        let settings = CombatSettings::default();
        let (attacker, defender) = battle.sides_mut(SideKind::Attacker);
        deploy_arrivals(attacker, 0);
        let result = check_instant_stack_wipe(attacker, defender, &settings, 0);

        assert!(result.defender);
        assert!(!result.attacker);
        assert!(!battle.defender.alive);
        assert_eq!(total_strength(&battle.defender, false), Fixed::ZERO);
    }

    #[test]
    fn test_side_awaiting_army_is_not_wiped() {
        let mut battle = BattleBuilder::new()
            .attacker_army_arriving(2, &["infantry", "infantry"])
            .defender_reserve(&["infantry"])
            .build();
        let settings = CombatSettings::default();
        for kind in [SideKind::Attacker, SideKind::Defender] {
            let side = battle.side_mut(kind);
            deploy_arrivals(side, 0);
            reinforce(side, false);
        }
        assert_eq!(total_strength(&battle.attacker, true), Fixed::ZERO);

        let (attacker, defender) = battle.sides_mut(SideKind::Attacker);
        assert!(!check_instant_stack_wipe(attacker, defender, &settings, 0).any());
        assert!(!should_stack_wipe(&battle.attacker, &battle.defender, &settings, true));
        assert!(battle.attacker.alive);
        assert!(!battle.attacker.stack_wiped);
    }

    #[test]
    fn test_routed_strength_counts_toward_total() {
        let mut battle = lopsided();
        let id = battle.defender.cohorts.live_ids()[0];
        if let Some(cohort) = battle.defender.cohorts.get_mut(id) {
            cohort.strength.take(Fixed::from_f64(0.5));
        }
        battle.defender.cohorts.defeat(id, 1);

        assert_eq!(total_strength(&battle.defender, true), Fixed::ZERO);
        assert_eq!(total_strength(&battle.defender, false), Fixed::HALF);

        // 100 against the 0.5 that routed is a ratio of 200
        let settings = |hard: f64| CombatSettings {
            hard_stack_wipe_limit: hard,
            soft_stack_wipe_limit: 2.0,
            ..Default::default()
        };
        assert!(should_stack_wipe(&battle.defender, &battle.attacker, &settings(150.0), false));
        assert!(!should_stack_wipe(&battle.defender, &battle.attacker, &settings(250.0), false));
        assert!(battle.defender.alive);

        stack_wipe(&mut battle.defender, Some(0), 1);
        assert_eq!(total_strength(&battle.defender, false), Fixed::ZERO);
    }

    #[test]
    fn test_check_stack_wipe_soft_limit() {
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"; 3])
            .defender_reserve(&["infantry"])
            .build();
        let settings = CombatSettings::default();
        for kind in [SideKind::Attacker, SideKind::Defender] {
            deploy_arrivals(battle.side_mut(kind), 0);
        }

        // 3:1 is below the hard limit but above the soft one
        let (defender, attacker) = battle.sides_mut(SideKind::Defender);
        assert!(!check_stack_wipe(defender, attacker, &settings, false, 1));
        assert!(check_stack_wipe(defender, attacker, &settings, true, 1));
        assert!(battle.defender.stack_wiped);
        // The enemy is never touched
        assert!(battle.attacker.alive);
    }

    #[test]
    fn test_stack_wipe_is_idempotent() {
        let mut battle = lopsided();
        stack_wipe(&mut battle.defender, Some(0), 2);
        let once: Vec<_> = battle.defender.cohorts.defeated().to_vec();
        let cohort = battle.defender.cohorts.get(once[0]).unwrap().state.clone();

        stack_wipe(&mut battle.defender, Some(0), 3);
        assert_eq!(battle.defender.cohorts.defeated(), once.as_slice());
        let again = battle.defender.cohorts.get(once[0]).unwrap();
        assert_eq!(again.state, cohort);
        assert_eq!(again.state.stack_wiped_by, Some(0));
        assert!(battle.defender.generals.is_empty());
        assert!(battle.defender.deployed_armies.is_empty());
        assert!(!battle.defender.cohorts.has_frontline());
        assert!(battle.defender.cohorts.reserve().is_empty());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_wipe_twice_equals_once(front in 0..6usize, reserve in 0..6usize) {
            let names: Vec<&str> = std::iter::repeat("infantry").take(front + reserve).collect();
            let mut battle = BattleBuilder::new()
                .settings(CombatSettings { combat_width: front.max(1) as i32, ..Default::default() })
                .defender_reserve(&names)
                .build();
            deploy_arrivals(&mut battle.defender, 0);
            reinforce(&mut battle.defender, false);

            stack_wipe(&mut battle.defender, None, 1);
            let once = battle.defender.cohorts.defeated().to_vec();
            stack_wipe(&mut battle.defender, None, 1);

            prop_assert_eq!(battle.defender.cohorts.defeated(), once.as_slice());
            prop_assert_eq!(once.len(), front + reserve);
            prop_assert_eq!(total_strength(&battle.defender, false), Fixed::ZERO);
        }
    }
}
