//! Cohort model: one deployed unit instance.
//!
//! A cohort splits into three parts:
//! - [`CohortProperties`]: immutable for the battle, shared via `Arc` so that
//!   branch snapshots in the analyzer never copy damage tables
//! - `morale` / `strength`: [`BoundedFixed`] values in `[0, max]`
//! - [`CohortState`]: round bookkeeping, reset or accumulated every round
//!
//! Cross-cohort references (`target`, `targeted_by`, `defeated_by`) are
//! [`CohortId`] handles into a side's arena. They may point at a cohort that
//! has since been defeated, so every lookup goes through a liveness check
//! (see [`crate::side::Cohorts::live`]).

use crate::bounded::BoundedFixed;
use crate::fixed::Fixed;
use crate::unit::{UnitRole, UnitTypeId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable index of a cohort inside its side's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CohortId(pub u32);

impl CohortId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    #[default]
    Default,
    Fire,
    Shock,
}

impl CombatPhase {
    pub const ALL: [CombatPhase; 3] = [CombatPhase::Default, CombatPhase::Fire, CombatPhase::Shock];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            CombatPhase::Default => 0,
            CombatPhase::Fire => 1,
            CombatPhase::Shock => 2,
        }
    }
}

/// Strength and morale damage multipliers for one attacker/defender/phase triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamagePair {
    pub strength: Fixed,
    pub morale: Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortProperties {
    pub unit_type: UnitTypeId,
    pub unit_name: String,
    pub role: UnitRole,
    /// Index of the owning army in the side definition
    pub army: usize,
    pub country: String,
    pub max_morale: Fixed,
    pub max_strength: Fixed,
    /// `1 - experience × ExperienceDamageReduction`, in [0, 1]
    pub experience_reduction: Fixed,
    /// Fraction of incoming damage negated, in [0, 1]
    pub damage_taken: Fixed,
    pub maneuver: u8,
    /// Precomputed per enemy unit type, indexed by [`CombatPhase::index`]
    pub damage: FxHashMap<UnitTypeId, [DamagePair; 3]>,
    /// Used against unit types missing from `damage`
    pub base_damage: [DamagePair; 3],
    /// Sort key for reserve pools (`max_strength × max_morale`)
    pub deployment_value: Fixed,
    pub cost: f64,
    pub maintenance: f64,
    pub capture_chance: Fixed,
}

impl CohortProperties {
    #[inline]
    pub fn damage_against(&self, enemy: UnitTypeId, phase: CombatPhase) -> DamagePair {
        match self.damage.get(&enemy) {
            Some(table) => table[phase.index()],
            None => self.base_damage[phase.index()],
        }
    }
}

/// Round bookkeeping of a cohort.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CohortState {
    pub target: Option<CohortId>,
    pub target_support: Option<CohortId>,
    pub is_flanking: bool,

    pub morale_loss: Fixed,
    pub strength_loss: Fixed,
    pub morale_dealt: Fixed,
    pub strength_dealt: Fixed,

    pub total_morale_lost: Fixed,
    pub total_strength_lost: Fixed,
    pub total_morale_dealt: Fixed,
    pub total_strength_dealt: Fixed,

    pub flank_ratio_penalty: Fixed,
    pub damage_multiplier: Fixed,

    pub is_defeated: bool,
    pub defeated_round: Option<i32>,
    /// First enemy cohort that attacked this one in the current round
    pub targeted_by: Option<CohortId>,
    pub targeted_count: u32,
    pub defeated_by: Option<CohortId>,
    /// Enemy army index credited with a stack wipe
    pub stack_wiped_by: Option<usize>,
    /// Chance this cohort was captured when defeated
    pub capture_chance: Fixed,
    /// Strength left when the cohort broke. Cleared by a stack wipe.
    pub routed_strength: Fixed,
}

impl CohortState {
    /// Clear per-round fields. Cumulative totals and defeat data persist.
    pub fn reset_round(&mut self) {
        self.target = None;
        self.target_support = None;
        self.is_flanking = false;
        self.morale_loss = Fixed::ZERO;
        self.strength_loss = Fixed::ZERO;
        self.morale_dealt = Fixed::ZERO;
        self.strength_dealt = Fixed::ZERO;
        self.targeted_by = None;
        self.targeted_count = 0;
    }
}

/// Where a cohort currently is. Changed only by [`crate::side::Cohorts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Frontline { row: usize, col: usize },
    Reserve(UnitRole),
    Defeated,
    Retreated,
}

#[derive(Debug, Clone)]
pub struct Cohort {
    id: CohortId,
    pub properties: Arc<CohortProperties>,
    pub morale: BoundedFixed,
    pub strength: BoundedFixed,
    pub state: CohortState,
    location: Location,
}

impl Cohort {
    pub(crate) fn new(id: CohortId, properties: Arc<CohortProperties>, pool: UnitRole) -> Self {
        Self {
            id,
            morale: BoundedFixed::full(properties.max_morale),
            strength: BoundedFixed::full(properties.max_strength),
            properties,
            state: CohortState::default(),
            location: Location::Reserve(pool),
        }
    }

    pub fn id(&self) -> CohortId {
        self.id
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// On the frontline or in reserve.
    pub fn is_live(&self) -> bool {
        !self.state.is_defeated
            && matches!(
                self.location,
                Location::Frontline { .. } | Location::Reserve(_)
            )
    }

    pub fn is_engaged(&self) -> bool {
        self.state.target.is_some() || self.state.targeted_count > 0
    }

    pub(crate) fn zero(&mut self) {
        self.morale.zero();
        self.strength.zero();
    }
}
