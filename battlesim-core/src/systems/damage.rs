use crate::cohort::CohortId;
use crate::config::CombatSettings;
use crate::fixed::Fixed;
use crate::side::Side;

/// Losses one attacker inflicts this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub attacker: CohortId,
    pub target: CohortId,
    pub strength: Fixed,
    pub morale: Fixed,
    pub support: Option<CohortId>,
    pub support_strength: Fixed,
    pub support_morale: Fixed,
}

/// Compute the hits `own` deals to `enemy` from the current states.
///
/// Reads only; losses of both sides are computed before either is applied.
pub fn compute_hits(own: &Side, enemy: &Side, settings: &CombatSettings) -> Vec<Hit> {
    if !own.alive || !enemy.alive {
        return Vec::new();
    }

    let results = &own.results;
    let base = (settings.base_damage()
        + settings.roll_damage() * Fixed::from_int(results.total_pips as i64))
    .min(settings.max_base_damage())
    .non_negative();
    let multiplier = (results.daily_multiplier * (Fixed::ONE + results.tactic_bonus)).non_negative();
    let casualties = (Fixed::ONE + results.tactic_casualties).non_negative();
    let support_share =
        (settings.support_damage() * (Fixed::ONE - results.flank_ratio_penalty)).clamp_unit();

    let mut hits = Vec::new();
    for (_, _, id) in own.cohorts.frontline_cells() {
        let Some(source) = own.cohorts.live(id) else {
            continue;
        };
        // Stale or missing target: idle
        let Some(target) = source.state.target.and_then(|t| enemy.cohorts.live(t)) else {
            continue;
        };

        let table = source
            .properties
            .damage_against(target.properties.unit_type, results.phase);
        let reduction = (Fixed::ONE - target.properties.damage_taken).clamp_unit()
            * target.properties.experience_reduction;

        let strength_damage =
            base * source.strength.get() * table.strength * multiplier * reduction;
        let morale_damage = base * source.morale.ratio() * table.morale * multiplier * reduction;

        let strength = strength_damage * settings.strength_lost_multiplier() * casualties;
        let morale = morale_damage * settings.morale_lost_multiplier();

        let support = source
            .state
            .target_support
            .filter(|&s| enemy.cohorts.live(s).is_some());
        let (support_strength, support_morale) = match support {
            Some(_) => (strength * support_share, morale * support_share),
            None => (Fixed::ZERO, Fixed::ZERO),
        };

        hits.push(Hit {
            attacker: id,
            target: target.id(),
            strength,
            morale,
            support,
            support_strength,
            support_morale,
        });
    }
    hits
}

fn add_loss(side: &mut Side, id: CohortId, strength: Fixed, morale: Fixed) {
    if let Some(cohort) = side.cohorts.get_mut(id) {
        cohort.state.strength_loss += strength;
        cohort.state.morale_loss += morale;
    }
}

/// Book `hits` as losses on `enemy` and as damage dealt on `own`.
pub fn record_hits(own: &mut Side, enemy: &mut Side, hits: &[Hit]) {
    let penalty = own.results.flank_ratio_penalty;
    let multiplier = own.results.daily_multiplier;

    for hit in hits {
        add_loss(enemy, hit.target, hit.strength, hit.morale);
        if let Some(support) = hit.support {
            add_loss(enemy, support, hit.support_strength, hit.support_morale);
        }

        if let Some(cohort) = own.cohorts.get_mut(hit.attacker) {
            let strength = hit.strength + hit.support_strength;
            let morale = hit.morale + hit.support_morale;
            cohort.state.strength_dealt += strength;
            cohort.state.morale_dealt += morale;
            cohort.state.total_strength_dealt += strength;
            cohort.state.total_morale_dealt += morale;
            cohort.state.flank_ratio_penalty = penalty;
            cohort.state.damage_multiplier = multiplier;
        }
    }

    log::trace!("{} landed {} hits", own.kind, hits.len());
}

/// Subtract the booked losses, plus daily morale loss for engaged cohorts.
pub fn apply_losses(side: &mut Side, settings: &CombatSettings) {
    let daily = Fixed::from_f64(settings.daily_morale_loss).non_negative();
    for id in side.cohorts.live_ids() {
        let Some(cohort) = side.cohorts.get_mut(id) else {
            continue;
        };
        if daily.is_positive() && cohort.is_engaged() {
            cohort.state.morale_loss += daily * cohort.properties.max_morale;
        }
        let strength_loss = cohort.state.strength_loss;
        let morale_loss = cohort.state.morale_loss;
        let strength_lost = cohort.strength.take(strength_loss);
        let morale_lost = cohort.morale.take(morale_loss);
        cohort.state.total_strength_lost += strength_lost;
        cohort.state.total_morale_lost += morale_lost;
    }
}
