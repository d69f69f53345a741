use crate::battle::{Battle, Outcome};
use crate::config::CombatSettings;
use crate::deployment::deploy_arrivals;
use crate::fixed::Fixed;
use crate::side::{RoundResults, Side, SideKind};
use crate::systems::damage::{apply_losses, compute_hits, record_hits};
use crate::systems::dice::{phase_index, phase_kind, roll};
use crate::systems::reinforcement::reinforce;
use crate::systems::stack_wipe::{check_instant_stack_wipe, should_stack_wipe, stack_wipe};
use crate::systems::targeting::assign_targets;
use tracing::instrument;

const SIDES: [SideKind; 2] = [SideKind::Attacker, SideKind::Defender];

/// Deploy initial armies, fill the frontline and run the instant stack wipe
/// check. Moves the battle from round -1 to round 0.
#[instrument(skip_all, name = "start_battle")]
pub fn start_battle(battle: &mut Battle, settings: &CombatSettings) {
    if battle.is_started() {
        return;
    }
    for kind in SIDES {
        let side = battle.side_mut(kind);
        deploy_arrivals(side, 0);
        reinforce(side, settings.back_row);
    }
    battle.round = 0;
    if settings.stackwiping {
        let (attacker, defender) = battle.sides_mut(SideKind::Attacker);
        check_instant_stack_wipe(attacker, defender, settings, 0);
    }
    mark_sides_out(battle, settings);
    battle.update_outcome();
}

fn round_results(battle: &Battle, kind: SideKind, settings: &CombatSettings) -> RoundResults {
    let own = battle.side(kind);
    let enemy = battle.side(kind.opponent());
    let phase = phase_index(battle.round, settings);
    let combat_phase = phase_kind(phase, settings);

    let dice = roll(&own.dice, battle.seed, phase, kind, settings);
    let general_pips =
        (own.general_skill(combat_phase) - enemy.general_skill(combat_phase)).max(0);
    let terrain_pips = if settings.defender_advantage && kind == SideKind::Defender {
        battle.terrain_roll()
    } else {
        0
    };
    let total_pips = (dice as i32 + general_pips + terrain_pips).max(0);

    let tactic_of = |side: &Side| battle.tactic(side.leading_general().and_then(|g| g.tactic.as_deref()));
    let own_tactic = tactic_of(own);
    let enemy_tactic = tactic_of(enemy);
    let tactic_bonus = match (own_tactic, enemy_tactic) {
        (Some(own), Some(enemy)) => Fixed::from_f64(own.effectiveness_against(enemy)),
        _ => Fixed::ZERO,
    };
    let tactic_casualties = Fixed::from_f64(
        own_tactic.map_or(0.0, |t| t.casualties) + enemy_tactic.map_or(0.0, |t| t.casualties),
    );

    let daily_multiplier = (Fixed::ONE
        + Fixed::from_f64(settings.daily_damage_increase) * Fixed::from_int((battle.round - 1).max(0) as i64))
    .non_negative();

    let live = own.live_count();
    let flank_ratio = if live == 0 {
        Fixed::ZERO
    } else {
        Fixed::from_int(own.live_flank_count() as i64) / Fixed::from_int(live as i64)
    };
    let required = Fixed::from_f64(settings.flank_ratio);
    let flank_ratio_penalty = if required.is_positive() && flank_ratio < required {
        (Fixed::from_f64(settings.flank_ratio_penalty) * (required - flank_ratio) / required)
            .clamp_unit()
    } else {
        Fixed::ZERO
    };

    RoundResults {
        phase: combat_phase,
        dice,
        terrain_pips,
        general_pips,
        total_pips,
        tactic_bonus,
        tactic_casualties,
        daily_multiplier,
        flank_ratio,
        flank_ratio_penalty,
    }
}

/// Reset round state, roll dice, compute modifiers and assign targets.
pub fn prepare_round(battle: &mut Battle, settings: &CombatSettings) {
    for kind in SIDES {
        battle.side_mut(kind).cohorts.reset_round_state();
    }
    let results = SIDES.map(|kind| round_results(battle, kind, settings));
    for kind in SIDES {
        battle.side_mut(kind).results = results[kind.index()];
    }
    assign_targets(battle, settings);
}

/// Defeat every frontline cohort at or below the minimum morale or strength.
fn resolve_defeats(battle: &mut Battle, settings: &CombatSettings) -> usize {
    let round = battle.round;
    let minimum_strength = settings.minimum_strength();
    let minimum_morale = settings.minimum_morale();
    let mut defeated = 0;

    for kind in SIDES {
        let (own, enemy) = battle.sides_mut(kind);
        let beaten: Vec<_> = own
            .cohorts
            .frontline_cells()
            .filter_map(|(_, _, id)| own.cohorts.live(id))
            .filter(|c| {
                c.strength.ratio() <= minimum_strength || c.morale.ratio() <= minimum_morale
            })
            .map(|c| (c.id(), c.state.targeted_by))
            .collect();

        for (id, by) in beaten {
            let capture_chance = by
                .and_then(|attacker| enemy.cohorts.get(attacker))
                .map_or(Fixed::ZERO, |attacker| attacker.properties.capture_chance);
            if let Some(cohort) = own.cohorts.get_mut(id) {
                cohort.state.defeated_by = by;
                cohort.state.capture_chance = capture_chance;
            }
            if own.cohorts.defeat(id, round) {
                log::trace!("Round {}: {} cohort {:?} defeated", round, kind, id);
                defeated += 1;
            }
        }
    }
    defeated
}

/// A side with nothing left on the frontline and no army still to arrive is
/// out. With stack wiping on, it is wiped instead of merely defeated when
/// the enemy's live strength dwarfs what it routed with: the soft limit
/// applies within the first `StackwipeRounds` rounds, the hard limit after.
fn mark_sides_out(battle: &mut Battle, settings: &CombatSettings) {
    let round = battle.round;
    let soft = round <= settings.stackwipe_rounds as i32;
    let driven_out = SIDES.map(|kind| {
        let side = battle.side(kind);
        side.alive && !side.cohorts.has_frontline() && side.all_deployed()
    });
    // Both decisions are made before either side changes
    let wiped = SIDES.map(|kind| {
        driven_out[kind.index()]
            && settings.stackwiping
            && should_stack_wipe(battle.side(kind), battle.side(kind.opponent()), settings, soft)
    });

    for kind in SIDES {
        if !driven_out[kind.index()] {
            continue;
        }
        let (own, enemy) = battle.sides_mut(kind);
        if wiped[kind.index()] {
            stack_wipe(own, enemy.leading_army(), round);
        } else {
            own.alive = false;
            log::debug!("Round {}: {} has no cohorts left", round, kind);
        }
    }
}

fn end_of_round(battle: &mut Battle, settings: &CombatSettings) {
    for kind in SIDES {
        reinforce(battle.side_mut(kind), settings.back_row);
    }
    mark_sides_out(battle, settings);
    battle.update_outcome();
}

/// Resolve one combat round. Returns false if the battle was already over.
#[instrument(skip_all, name = "advance_round")]
pub fn advance_round(battle: &mut Battle, settings: &CombatSettings) -> bool {
    if !battle.is_started() {
        start_battle(battle, settings);
    }
    if battle.fight_over {
        return false;
    }

    battle.round += 1;
    let round = battle.round;
    for kind in SIDES {
        let side = battle.side_mut(kind);
        deploy_arrivals(side, round);
        reinforce(side, settings.back_row);
    }

    prepare_round(battle, settings);

    // Simultaneous resolution: both sides' hits come from pre-round states
    let attacker_hits = compute_hits(&battle.attacker, &battle.defender, settings);
    let defender_hits = compute_hits(&battle.defender, &battle.attacker, settings);
    record_hits(&mut battle.attacker, &mut battle.defender, &attacker_hits);
    record_hits(&mut battle.defender, &mut battle.attacker, &defender_hits);
    apply_losses(&mut battle.attacker, settings);
    apply_losses(&mut battle.defender, settings);

    let defeated = resolve_defeats(battle, settings);
    end_of_round(battle, settings);

    log::debug!(
        "Round {}: pips {} vs {}, {} hits vs {}, {} defeated",
        round,
        battle.attacker.results.total_pips,
        battle.defender.results.total_pips,
        attacker_hits.len(),
        defender_hits.len(),
        defeated
    );
    true
}

/// Advance until `round` is reached or the battle ends.
pub fn run_until(battle: &mut Battle, settings: &CombatSettings, round: i32) {
    while battle.round < round && advance_round(battle, settings) {}
}

/// Run to completion, bounded by `MaxRounds`.
pub fn run_battle(battle: &mut Battle, settings: &CombatSettings) -> Option<Outcome> {
    run_until(battle, settings, settings.max_rounds as i32);
    if !battle.fight_over {
        log::warn!(
            "Battle still undecided after {} rounds, stopping",
            settings.max_rounds
        );
    }
    battle.outcome
}

/// Withdraw every live cohort of a side. The side is out but not defeated.
pub fn retreat(side: &mut Side) {
    for id in side.cohorts.live_ids() {
        side.cohorts.retreat(id);
    }
    side.alive = false;
    side.retreated = true;
    log::info!("{} retreats", side.kind);
}

/// Retreat a side and settle the battle.
pub fn retreat_side(battle: &mut Battle, kind: SideKind) {
    retreat(battle.side_mut(kind));
    battle.update_outcome();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BattleBuilder, UnitBuilder};
    use crate::unit::{DiceSource, Tactic, Terrain};

    fn duel(settings: &CombatSettings) -> Battle {
        BattleBuilder::new()
            .settings(settings.clone())
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .attacker_dice(DiceSource::Fixed(4))
            .defender_dice(DiceSource::Fixed(4))
            .seed(7)
            .build()
    }

    fn front_cohort(battle: &Battle, kind: SideKind) -> &crate::cohort::Cohort {
        let side = battle.side(kind);
        side.cohorts
            .get(side.cohorts.cell(0, side.cohorts.width() / 2).unwrap())
            .unwrap()
    }

    #[test]
    fn test_one_round_of_equal_duel() {
        let settings = CombatSettings::default();
        let mut battle = duel(&settings);
        assert!(advance_round(&mut battle, &settings));
        assert_eq!(battle.round, 1);

        for kind in SIDES {
            let cohort = front_cohort(&battle, kind);
            assert_eq!(cohort.strength.get(), Fixed::from_raw(96_160));
            assert_eq!(cohort.morale.get(), Fixed::from_raw(271_200));
            assert_eq!(cohort.state.strength_loss, Fixed::from_raw(3_840));
            assert_eq!(cohort.state.morale_dealt, Fixed::from_raw(28_800));
        }
        assert!(!battle.fight_over);
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let settings = CombatSettings::default();
        let mut first = duel(&settings);
        let mut second = duel(&settings);
        run_until(&mut first, &settings, 6);
        run_until(&mut second, &settings, 6);

        for kind in SIDES {
            let a = front_cohort(&first, kind);
            let b = front_cohort(&second, kind);
            assert_eq!(a.strength, b.strength);
            assert_eq!(a.morale, b.morale);
            assert_eq!(a.state, b.state);
        }
    }

    #[test]
    fn test_random_dice_are_deterministic_per_seed() {
        let settings = CombatSettings::default();
        let build = || {
            BattleBuilder::new()
                .attacker_reserve(&["infantry"; 4])
                .defender_reserve(&["infantry"; 4])
                .seed(1234)
                .build()
        };
        let mut first = build();
        let mut second = build();
        run_battle(&mut first, &settings);
        run_battle(&mut second, &settings);

        assert_eq!(first.round, second.round);
        assert_eq!(first.outcome, second.outcome);
    }

    #[test]
    fn test_duel_ends_with_draw() {
        // Identical cohorts with identical dice break on the same round
        let settings = CombatSettings::default();
        let mut battle = duel(&settings);
        assert_eq!(run_battle(&mut battle, &settings), Some(Outcome::Draw));
        assert!(battle.round > 1);
        assert!(!battle.attacker.alive && !battle.defender.alive);
    }

    #[test]
    fn test_better_dice_win() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .attacker_dice(DiceSource::Fixed(6))
            .defender_dice(DiceSource::Fixed(1))
            .build();
        assert_eq!(run_battle(&mut battle, &settings), Some(Outcome::AttackerWins));

        let loser = battle.defender.cohorts.get(battle.defender.cohorts.defeated()[0]).unwrap();
        assert!(loser.state.is_defeated);
        assert_eq!(loser.strength.get(), Fixed::ZERO);
        assert_eq!(loser.morale.get(), Fixed::ZERO);
        assert!(loser.state.defeated_by.is_some());
        assert_eq!(loser.state.defeated_round, Some(battle.round));
        // An even fight ends in a rout, not a stack wipe
        assert!(loser.state.routed_strength.is_positive());
        assert!(!battle.defender.stack_wiped);
    }

    #[test]
    fn test_general_and_terrain_pips() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .attacker_general(3, None)
            .defender_general(1, None)
            .attacker_dice(DiceSource::Fixed(2))
            .defender_dice(DiceSource::Fixed(2))
            .terrain(Terrain {
                name: "hills".to_string(),
                roll: 1,
                ..Default::default()
            })
            .build();
        advance_round(&mut battle, &settings);

        assert_eq!(battle.attacker.results.general_pips, 2);
        assert_eq!(battle.attacker.results.total_pips, 4);
        assert_eq!(battle.defender.results.general_pips, 0);
        assert_eq!(battle.defender.results.terrain_pips, 1);
        assert_eq!(battle.defender.results.total_pips, 3);
    }

    #[test]
    fn test_tactics_and_daily_multiplier() {
        let settings = CombatSettings::default();
        let mut effectiveness = rustc_hash::FxHashMap::default();
        effectiveness.insert("bottleneck".to_string(), 0.25);
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .tactic(Tactic {
                name: "skirmishing".to_string(),
                effectiveness,
                casualties: 0.1,
            })
            .tactic(Tactic {
                name: "bottleneck".to_string(),
                casualties: 0.05,
                ..Default::default()
            })
            .attacker_general(0, Some("skirmishing"))
            .defender_general(0, Some("bottleneck"))
            .build();
        run_until(&mut battle, &settings, 3);

        let results = battle.attacker.results;
        assert_eq!(results.tactic_bonus, Fixed::from_f64(0.25));
        assert_eq!(results.tactic_casualties, Fixed::from_f64(0.15));
        assert_eq!(battle.defender.results.tactic_bonus, Fixed::ZERO);
        assert_eq!(results.daily_multiplier, Fixed::from_f64(1.02));
    }

    #[test]
    fn test_flank_ratio_penalty() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry", "infantry", "infantry", "cavalry"])
            .defender_reserve(&["infantry"; 4])
            .build();
        advance_round(&mut battle, &settings);

        // 1 of 4 is flank: penalty = 0.5 × (0.5 − 0.25) / 0.5
        assert_eq!(battle.attacker.results.flank_ratio, Fixed::from_f64(0.25));
        assert_eq!(
            battle.attacker.results.flank_ratio_penalty,
            Fixed::from_f64(0.25)
        );
        assert_eq!(
            battle.defender.results.flank_ratio_penalty,
            Fixed::from_f64(0.5)
        );
    }

    #[test]
    fn test_late_arrival_joins_reserve() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .defender_reserve(&["infantry"])
            .attacker_army_arriving(3, &["infantry", "infantry"])
            .build();
        run_until(&mut battle, &settings, 2);
        assert_eq!(battle.attacker.live_count(), 1);
        run_until(&mut battle, &settings, 3);
        assert_eq!(battle.attacker.live_count(), 3);
    }

    #[test]
    fn test_side_waits_for_its_only_army() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_army_arriving(2, &["infantry", "infantry"])
            .defender_reserve(&["infantry"])
            .build();
        start_battle(&mut battle, &settings);
        assert!(!battle.fight_over);
        assert!(battle.attacker.alive);

        run_until(&mut battle, &settings, 2);
        assert_eq!(battle.round, 2);
        assert!(!battle.fight_over);
        assert_eq!(battle.attacker.live_count(), 2);
        assert!(!battle.attacker.stack_wiped);
    }

    #[test]
    fn test_broken_line_holds_out_for_reinforcements() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"])
            .attacker_army_arriving(30, &["infantry"])
            .defender_reserve(&["infantry"; 3])
            .attacker_dice(DiceSource::Fixed(1))
            .defender_dice(DiceSource::Fixed(6))
            .build();
        run_until(&mut battle, &settings, 10);

        assert_eq!(battle.round, 10);
        assert_eq!(battle.attacker.live_count(), 0);
        assert_eq!(battle.attacker.cohorts.defeated().len(), 1);
        assert!(battle.attacker.alive);
        assert!(!battle.attacker.stack_wiped);
        assert!(!battle.fight_over);
    }

    #[test]
    fn test_outnumbered_side_fights_before_stack_wipe() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .attacker_reserve(&["infantry"; 3])
            .defender_reserve(&["infantry"])
            .build();
        advance_round(&mut battle, &settings);
        assert!(!battle.fight_over);
        assert!(battle.defender.alive);

        // Three fresh cohorts against the remnant of one exceed the soft limit
        assert_eq!(run_battle(&mut battle, &settings), Some(Outcome::AttackerWins));
        assert!(battle.round > 1);
        assert!(battle.round <= settings.stackwipe_rounds as i32);
        assert!(battle.defender.stack_wiped);
        assert!(battle.any_stack_wiped());
    }

    #[test]
    fn test_instant_wipe_ends_before_first_round() {
        let settings = CombatSettings::default();
        let mut battle = BattleBuilder::new()
            .unit(UnitBuilder::new("legion").max_strength(20.0).build())
            .attacker_reserve(&["legion"])
            .defender_reserve(&["infantry"])
            .build();
        assert!(!advance_round(&mut battle, &settings));
        assert_eq!(battle.round, 0);
        assert_eq!(battle.outcome, Some(Outcome::AttackerWins));
    }

    #[test]
    fn test_retreat_side() {
        let settings = CombatSettings::default();
        let mut battle = duel(&settings);
        advance_round(&mut battle, &settings);
        retreat_side(&mut battle, SideKind::Defender);

        assert!(battle.defender.retreated);
        assert_eq!(battle.defender.cohorts.retreated().len(), 1);
        assert!(battle.defender.cohorts.defeated().is_empty());
        assert_eq!(battle.outcome, Some(Outcome::AttackerWins));
        assert!(!advance_round(&mut battle, &settings));
    }

    #[test]
    fn test_daily_morale_loss_for_engaged_cohorts() {
        let settings = CombatSettings {
            daily_morale_loss: 0.1,
            ..Default::default()
        };
        let mut battle = duel(&settings);
        advance_round(&mut battle, &settings);
        // 0.288 from the hit plus 0.1 × 3.0
        let cohort = front_cohort(&battle, SideKind::Attacker);
        assert_eq!(cohort.morale.get(), Fixed::from_raw(241_200));
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_values_stay_in_bounds(
            seed in any::<u64>(),
            attackers in 1..6usize,
            defenders in 1..6usize,
        ) {
            let settings = CombatSettings { stackwiping: false, ..Default::default() };
            let a: Vec<&str> = ["infantry", "cavalry", "archers"].iter().cycle().take(attackers).copied().collect();
            let d: Vec<&str> = ["cavalry", "infantry"].iter().cycle().take(defenders).copied().collect();
            let mut battle = BattleBuilder::new()
                .attacker_reserve(&a)
                .defender_reserve(&d)
                .seed(seed)
                .build();

            for _ in 0..40 {
                if !advance_round(&mut battle, &settings) {
                    break;
                }
                for kind in SIDES {
                    for cohort in battle.side(kind).cohorts.iter() {
                        prop_assert!(cohort.strength.get() >= Fixed::ZERO);
                        prop_assert!(cohort.strength.get() <= cohort.properties.max_strength);
                        prop_assert!(cohort.morale.get() >= Fixed::ZERO);
                        prop_assert!(cohort.morale.get() <= cohort.properties.max_morale);
                        if cohort.state.is_defeated {
                            prop_assert_eq!(cohort.strength.get(), Fixed::ZERO);
                            prop_assert_eq!(cohort.morale.get(), Fixed::ZERO);
                        }
                    }
                }
            }
        }
    }
}
