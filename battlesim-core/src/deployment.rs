//! Composition layer: definitions in, ready-to-fight sides out.
//!
//! Conversion is pure with respect to its inputs and caches nothing; callers
//! re-run it whenever unit, army or terrain definitions change.

use crate::battle::Battle;
use crate::cohort::{CohortProperties, CombatPhase, DamagePair};
use crate::config::CombatSettings;
use crate::fixed::Fixed;
use crate::side::{CombatArmy, Cohorts, General, RoundResults, Side, SideKind, SortedReserve};
use crate::unit::{
    ArmyDefinition, SideDefinition, Tactic, Terrain, UnitCatalog, UnitDefinition, UnitRole,
    UnitTypeId,
};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Frontline width after terrain modifiers, at least 1.
pub fn combat_width(terrains: &[Terrain], settings: &CombatSettings) -> usize {
    let width = settings.combat_width + terrains.iter().map(|t| t.combat_width).sum::<i32>();
    width.max(1) as usize
}

fn phase_multiplier(unit: &UnitDefinition, phase: CombatPhase) -> f64 {
    match phase {
        CombatPhase::Default => 1.0,
        CombatPhase::Fire => unit.fire,
        CombatPhase::Shock => unit.shock,
    }
}

fn damage_row(unit: &UnitDefinition, versus: f64) -> [DamagePair; 3] {
    CombatPhase::ALL.map(|phase| {
        let common = unit.damage_done * phase_multiplier(unit, phase) * versus;
        DamagePair {
            strength: Fixed::from_f64(common * unit.strength_damage_done).non_negative(),
            morale: Fixed::from_f64(common * unit.morale_damage_done).non_negative(),
        }
    })
}

/// Build the static half of a cohort.
///
/// Damage is precomputed against every enemy unit type so the round engine
/// only does a table lookup per attacker.
#[allow(clippy::too_many_arguments)]
pub fn cohort_properties(
    unit_type: UnitTypeId,
    unit: &UnitDefinition,
    army: usize,
    country: &str,
    catalog: &UnitCatalog,
    enemy_unit_types: &[UnitTypeId],
    terrains: &[Terrain],
    settings: &CombatSettings,
) -> CohortProperties {
    let terrain: f64 = terrains.iter().map(|t| t.unit_damage(&unit.name)).product();

    let mut damage = FxHashMap::default();
    for &enemy in enemy_unit_types {
        if let Some(enemy_unit) = catalog.get(enemy) {
            damage.insert(enemy, damage_row(unit, unit.versus(&enemy_unit.name) * terrain));
        }
    }

    let max_morale = Fixed::from_f64(unit.max_morale).non_negative();
    let max_strength = Fixed::from_f64(unit.max_strength).non_negative();
    let experience_reduction =
        (Fixed::ONE - Fixed::from_f64(unit.experience * settings.experience_damage_reduction))
            .clamp_unit();

    CohortProperties {
        unit_type,
        unit_name: unit.name.clone(),
        role: unit.role,
        army,
        country: country.to_string(),
        max_morale,
        max_strength,
        experience_reduction,
        damage_taken: Fixed::from_f64(unit.damage_taken).clamp_unit(),
        maneuver: unit.maneuver(),
        damage,
        base_damage: damage_row(unit, terrain),
        deployment_value: max_strength * max_morale,
        cost: unit.cost.max(0.0),
        maintenance: unit.maintenance.max(0.0),
        capture_chance: Fixed::from_f64(unit.capture_chance).clamp_unit(),
    }
}

fn role_pools(units: Vec<Arc<CohortProperties>>, reserve: &mut SortedReserve) {
    for unit in units {
        match unit.role {
            UnitRole::Front => reserve.front.push(unit),
            UnitRole::Flank => reserve.flank.push(unit),
            UnitRole::Support => reserve.support.push(unit),
        }
    }
}

/// Move every unit of the named type out of `units`, keeping order.
fn take_type(
    units: &mut Vec<Arc<CohortProperties>>,
    name: Option<&str>,
    limit: usize,
) -> Vec<Arc<CohortProperties>> {
    let Some(name) = name else {
        return Vec::new();
    };
    let mut taken = Vec::new();
    let mut rest = Vec::with_capacity(units.len());
    for unit in units.drain(..) {
        if taken.len() < limit && unit.unit_name == name {
            taken.push(unit);
        } else {
            rest.push(unit);
        }
    }
    *units = rest;
    taken
}

fn sort_reserve(
    mut units: Vec<Arc<CohortProperties>>,
    army: &ArmyDefinition,
    settings: &CombatSettings,
) -> SortedReserve {
    let mut reserve = SortedReserve::default();

    if !settings.custom_deployment {
        role_pools(units, &mut reserve);
        // Stable: equal values keep reserve order
        for pool in [&mut reserve.front, &mut reserve.flank, &mut reserve.support] {
            pool.sort_by(|a, b| b.deployment_value.cmp(&a.deployment_value));
        }
        return reserve;
    }

    let prefs = &army.preferences;
    reserve.flank = take_type(&mut units, prefs.flank.as_deref(), 2 * army.flank_size);
    reserve.front = take_type(&mut units, prefs.primary.as_deref(), usize::MAX);
    reserve
        .front
        .extend(take_type(&mut units, prefs.secondary.as_deref(), usize::MAX));
    role_pools(units, &mut reserve);
    reserve
}

/// Convert one army definition into a [`CombatArmy`].
///
/// Reserve entries that do not resolve through the catalog are skipped with a
/// warning; conversion never fails.
pub fn convert_army(
    army: &ArmyDefinition,
    army_index: usize,
    catalog: &UnitCatalog,
    enemy_unit_types: &[UnitTypeId],
    terrains: &[Terrain],
    settings: &CombatSettings,
) -> CombatArmy {
    let mut units = Vec::with_capacity(army.reserve.len());
    for entry in &army.reserve {
        match catalog.get_combat_unit(entry) {
            Some((unit_type, unit)) => units.push(Arc::new(cohort_properties(
                unit_type,
                unit,
                army_index,
                &army.country,
                catalog,
                enemy_unit_types,
                terrains,
                settings,
            ))),
            None => log::warn!(
                "Army '{}': unknown unit type '{}' in reserve, skipping",
                army.name,
                entry
            ),
        }
    }

    let general = General {
        name: army.general.name.clone(),
        martial: army.general.martial,
        fire: army.general.fire,
        shock: army.general.shock,
        priority: army.general.priority,
        tactic: army.general.tactic.clone(),
        army: army_index,
    };

    CombatArmy {
        index: army_index,
        name: army.name.clone(),
        country: army.country.clone(),
        general,
        arrival: army.arrival,
        flank_size: army.flank_size,
        reserve: sort_reserve(units, army, settings),
    }
}

/// Side shell: no cohorts yet, `alive`, armies ordered by general priority.
pub fn convert_side(
    kind: SideKind,
    definition: &SideDefinition,
    mut armies: Vec<CombatArmy>,
    width: usize,
    settings: &CombatSettings,
) -> Side {
    armies.sort_by_key(|a| a.general.priority);
    let generals = armies.iter().map(|a| a.general.clone()).collect();
    let rows = if settings.back_row { 2 } else { 1 };

    Side {
        kind,
        alive: true,
        cohorts: Cohorts::new(rows, width),
        armies,
        deployed_armies: Vec::new(),
        generals,
        dice: definition.dice.clone(),
        results: RoundResults::default(),
        stack_wiped: false,
        retreated: false,
    }
}

/// Move the reserves of every army that has arrived by `round` into the
/// side's pools. Returns the number of armies deployed.
pub fn deploy_arrivals(side: &mut Side, round: i32) -> usize {
    // A wiped or retreated side takes no further reinforcements
    if !side.alive {
        return 0;
    }
    let mut deployed = 0;
    for (i, army) in side.armies.iter_mut().enumerate() {
        if side.deployed_armies.contains(&i) || army.arrival as i64 > round as i64 {
            continue;
        }
        let reserve = std::mem::take(&mut army.reserve);
        log::debug!(
            "Round {}: {} army '{}' arrives with {} cohorts",
            round,
            side.kind,
            army.name,
            reserve.len()
        );
        for (pool, units) in [
            (UnitRole::Front, reserve.front),
            (UnitRole::Flank, reserve.flank),
            (UnitRole::Support, reserve.support),
        ] {
            for unit in units {
                side.cohorts.enlist(unit, pool);
            }
        }
        side.deployed_armies.push(i);
        deployed += 1;
    }
    side.deployed_armies.sort_unstable();
    deployed
}

fn unit_types(side: &SideDefinition, catalog: &UnitCatalog) -> Vec<UnitTypeId> {
    let mut ids: Vec<UnitTypeId> = side
        .armies
        .iter()
        .flat_map(|a| a.reserve.iter())
        .filter_map(|name| catalog.id(name))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Seed derived from the starting definitions.
pub fn derive_seed(attacker: &SideDefinition, defender: &SideDefinition, terrains: &[Terrain]) -> u64 {
    let mut hasher = FxHasher::default();
    attacker.hash(&mut hasher);
    defender.hash(&mut hasher);
    for terrain in terrains {
        terrain.name.hash(&mut hasher);
        terrain.roll.hash(&mut hasher);
        terrain.combat_width.hash(&mut hasher);
    }
    hasher.finish()
}

/// Convert both sides and assemble a battle that has not started yet.
pub fn build_battle(
    attacker: &SideDefinition,
    defender: &SideDefinition,
    catalog: &UnitCatalog,
    terrains: &[Terrain],
    tactics: &[Tactic],
    settings: &CombatSettings,
    seed: Option<u64>,
) -> Battle {
    let width = combat_width(terrains, settings);

    let convert = |kind: SideKind, own: &SideDefinition, enemy: &SideDefinition| {
        let enemy_types = unit_types(enemy, catalog);
        let armies = own
            .armies
            .iter()
            .enumerate()
            .map(|(i, army)| {
                if let Some(tactic) = &army.general.tactic {
                    if !tactics.iter().any(|t| &t.name == tactic) {
                        log::warn!(
                            "Army '{}': unknown tactic '{}', general fights without one",
                            army.name,
                            tactic
                        );
                    }
                }
                convert_army(army, i, catalog, &enemy_types, terrains, settings)
            })
            .collect();
        convert_side(kind, own, armies, width, settings)
    };

    let attacker_side = convert(SideKind::Attacker, attacker, defender);
    let defender_side = convert(SideKind::Defender, defender, attacker);
    let seed = seed.unwrap_or_else(|| derive_seed(attacker, defender, terrains));

    log::info!(
        "Battle built: width {}, {} vs {} armies, seed {}",
        width,
        attacker.armies.len(),
        defender.armies.len(),
        seed
    );

    Battle::new(attacker_side, defender_side, terrains, tactics, seed)
}
