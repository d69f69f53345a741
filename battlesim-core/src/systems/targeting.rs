use crate::battle::Battle;
use crate::cohort::CohortId;
use crate::config::CombatSettings;
use crate::side::{Side, SideKind};

/// Pick the enemy front-row column a cohort at `col` attacks.
///
/// Returns `(column, is_flanking)`. Straight ahead wins; otherwise the
/// nearest live cell within `maneuver` columns. Equal distance goes left,
/// or with `FixTargeting` to the candidate with fewer attackers so far.
fn select_column(
    enemy: &Side,
    col: usize,
    maneuver: u8,
    fix_targeting: bool,
) -> Option<(usize, bool)> {
    let width = enemy.cohorts.width();
    let live = |c: usize| enemy.cohorts.live_at(0, c);

    if live(col).is_some() {
        return Some((col, false));
    }

    for distance in 1..=maneuver as usize {
        let left = col.checked_sub(distance).filter(|&c| live(c).is_some());
        let right = Some(col + distance).filter(|&c| c < width && live(c).is_some());
        let chosen = match (left, right) {
            (Some(l), Some(r)) if fix_targeting => {
                let count = |c| live(c).map_or(0, |cohort| cohort.state.targeted_count);
                if count(r) < count(l) {
                    r
                } else {
                    l
                }
            }
            (Some(l), _) => l,
            (None, Some(r)) => r,
            (None, None) => continue,
        };
        return Some((chosen, true));
    }
    None
}

fn assign_side(own: &mut Side, enemy: &mut Side, settings: &CombatSettings) -> usize {
    if !own.alive || !enemy.alive {
        return 0;
    }

    let cells: Vec<(usize, usize, CohortId)> = own.cohorts.frontline_cells().collect();
    let mut assigned = 0;

    for (_, col, id) in cells {
        let Some(attacker) = own.cohorts.live(id) else {
            continue;
        };
        let maneuver = attacker.properties.maneuver;
        let Some((target_col, is_flanking)) =
            select_column(enemy, col, maneuver, settings.fix_targeting)
        else {
            continue;
        };
        let Some(target) = enemy.cohorts.cell(0, target_col) else {
            continue;
        };
        let support = enemy
            .cohorts
            .live_at(1, target_col)
            .map(|cohort| cohort.id());

        if let Some(cohort) = own.cohorts.get_mut(id) {
            cohort.state.target = Some(target);
            cohort.state.target_support = support;
            cohort.state.is_flanking = is_flanking;
        }
        if let Some(cohort) = enemy.cohorts.get_mut(target) {
            cohort.state.targeted_count += 1;
            cohort.state.targeted_by.get_or_insert(id);
        }
        assigned += 1;
    }
    assigned
}

/// Assign targets for every occupied frontline cell of both sides.
///
/// Round state must have been reset first so no stale handle survives.
pub fn assign_targets(battle: &mut Battle, settings: &CombatSettings) {
    for kind in [SideKind::Attacker, SideKind::Defender] {
        let (own, enemy) = battle.sides_mut(kind);
        let assigned = assign_side(own, enemy, settings);
        log::trace!("Round {}: {} assigned {} targets", battle.round, kind, assigned);
    }
}
