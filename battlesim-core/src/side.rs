use crate::cohort::{Cohort, CohortId, CohortProperties, CombatPhase, Location};
use crate::fixed::Fixed;
use crate::unit::{DiceSource, UnitRole};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideKind {
    Attacker,
    Defender,
}

impl SideKind {
    pub fn index(self) -> usize {
        match self {
            SideKind::Attacker => 0,
            SideKind::Defender => 1,
        }
    }

    pub fn opponent(self) -> SideKind {
        match self {
            SideKind::Attacker => SideKind::Defender,
            SideKind::Defender => SideKind::Attacker,
        }
    }
}

impl std::fmt::Display for SideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideKind::Attacker => write!(f, "attacker"),
            SideKind::Defender => write!(f, "defender"),
        }
    }
}

/// Reserve pools, each in deployment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reserve {
    pub front: Vec<CohortId>,
    pub flank: Vec<CohortId>,
    pub support: Vec<CohortId>,
}

impl Reserve {
    pub fn pool(&self, role: UnitRole) -> &[CohortId] {
        match role {
            UnitRole::Front => &self.front,
            UnitRole::Flank => &self.flank,
            UnitRole::Support => &self.support,
        }
    }

    fn pool_mut(&mut self, role: UnitRole) -> &mut Vec<CohortId> {
        match role {
            UnitRole::Front => &mut self.front,
            UnitRole::Flank => &mut self.flank,
            UnitRole::Support => &mut self.support,
        }
    }

    pub fn len(&self) -> usize {
        self.front.len() + self.flank.len() + self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = CohortId> + '_ {
        self.front
            .iter()
            .chain(self.flank.iter())
            .chain(self.support.iter())
            .copied()
    }
}

/// Sole owner of every cohort of a side.
///
/// The arena is an `im::Vector` so cloning a side for an analyzer branch is
/// O(1); writes copy only the touched chunk. Placement is tracked both in the
/// grid/pools and in each cohort's [`Location`]; all moves go through the
/// methods below, which keeps a live cohort in exactly one place.
#[derive(Debug, Clone)]
pub struct Cohorts {
    arena: Vector<Cohort>,
    /// `rows × width`, row 0 is the front row
    frontline: Vec<Vec<Option<CohortId>>>,
    reserve: Reserve,
    defeated: Vec<CohortId>,
    retreated: Vec<CohortId>,
}

impl Cohorts {
    pub fn new(rows: usize, width: usize) -> Self {
        Self {
            arena: Vector::new(),
            frontline: vec![vec![None; width.max(1)]; rows.max(1)],
            reserve: Reserve::default(),
            defeated: Vec::new(),
            retreated: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.frontline.len()
    }

    pub fn width(&self) -> usize {
        self.frontline.first().map_or(0, |row| row.len())
    }

    /// Number of cohorts ever enlisted (live or not).
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, id: CohortId) -> Option<&Cohort> {
        self.arena.get(id.index())
    }

    pub fn get_mut(&mut self, id: CohortId) -> Option<&mut Cohort> {
        self.arena.get_mut(id.index())
    }

    /// Resolve a handle only if the cohort is still on the field.
    pub fn live(&self, id: CohortId) -> Option<&Cohort> {
        self.get(id).filter(|c| c.is_live())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cohort> {
        self.arena.iter()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<CohortId> {
        self.frontline.get(row)?.get(col).copied().flatten()
    }

    pub fn live_at(&self, row: usize, col: usize) -> Option<&Cohort> {
        self.cell(row, col).and_then(|id| self.live(id))
    }

    /// Occupied cells as `(row, col, id)`, row-major.
    pub fn frontline_cells(&self) -> impl Iterator<Item = (usize, usize, CohortId)> + '_ {
        self.frontline.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.map(|id| (row, col, id)))
        })
    }

    pub fn has_frontline(&self) -> bool {
        self.frontline_cells().next().is_some()
    }

    pub fn reserve(&self) -> &Reserve {
        &self.reserve
    }

    pub fn defeated(&self) -> &[CohortId] {
        &self.defeated
    }

    pub fn retreated(&self) -> &[CohortId] {
        &self.retreated
    }

    /// Frontline then reserve, in placement order.
    pub fn live_ids(&self) -> Vec<CohortId> {
        self.frontline_cells()
            .map(|(_, _, id)| id)
            .chain(self.reserve.iter())
            .collect()
    }

    /// Add a new cohort to the back of a reserve pool.
    pub fn enlist(&mut self, properties: Arc<CohortProperties>, pool: UnitRole) -> CohortId {
        let id = CohortId(self.arena.len() as u32);
        self.arena.push_back(Cohort::new(id, properties, pool));
        self.reserve.pool_mut(pool).push(id);
        id
    }

    /// Move the first cohort of `pool` into an empty frontline cell.
    pub fn deploy_from_reserve(&mut self, pool: UnitRole, row: usize, col: usize) -> Option<CohortId> {
        debug_assert!(
            self.cell(row, col).is_none(),
            "deploying into occupied cell ({row}, {col})"
        );
        if self.reserve.pool(pool).is_empty() {
            return None;
        }
        let id = self.reserve.pool_mut(pool).remove(0);
        self.frontline[row][col] = Some(id);
        if let Some(cohort) = self.arena.get_mut(id.index()) {
            cohort.set_location(Location::Frontline { row, col });
        }
        Some(id)
    }

    fn detach(&mut self, id: CohortId) {
        let Some(location) = self.get(id).map(|c| c.location()) else {
            return;
        };
        match location {
            Location::Frontline { row, col } => {
                debug_assert_eq!(self.frontline[row][col], Some(id));
                self.frontline[row][col] = None;
            }
            Location::Reserve(pool) => self.reserve.pool_mut(pool).retain(|&other| other != id),
            Location::Defeated | Location::Retreated => {}
        }
    }

    /// Defeat a cohort: zero it, remove it from its cell or pool and append
    /// it to `defeated`. Returns false if it was already defeated.
    pub fn defeat(&mut self, id: CohortId, round: i32) -> bool {
        match self.get(id) {
            Some(cohort) if !cohort.state.is_defeated && cohort.location() != Location::Retreated => {}
            _ => return false,
        }
        self.detach(id);
        if let Some(cohort) = self.arena.get_mut(id.index()) {
            cohort.state.routed_strength = cohort.strength.get();
            cohort.zero();
            cohort.state.is_defeated = true;
            cohort.state.defeated_round = Some(round);
            cohort.set_location(Location::Defeated);
        }
        self.defeated.push(id);
        true
    }

    /// Withdraw a live cohort without defeating it.
    pub fn retreat(&mut self, id: CohortId) -> bool {
        if self.live(id).is_none() {
            return false;
        }
        self.detach(id);
        if let Some(cohort) = self.arena.get_mut(id.index()) {
            cohort.set_location(Location::Retreated);
        }
        self.retreated.push(id);
        true
    }

    /// Zero everything in `defeated`, including the strength routed
    /// cohorts carried off the field.
    pub fn zero_defeated(&mut self) {
        for &id in &self.defeated {
            if let Some(cohort) = self.arena.get_mut(id.index()) {
                cohort.zero();
                cohort.state.routed_strength = Fixed::ZERO;
            }
        }
    }

    pub fn reset_round_state(&mut self) {
        for id in self.live_ids() {
            if let Some(cohort) = self.arena.get_mut(id.index()) {
                cohort.state.reset_round();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct General {
    pub name: String,
    pub martial: i32,
    pub fire: i32,
    pub shock: i32,
    pub priority: i32,
    /// Name of a tactic in the battle's tactic list
    pub tactic: Option<String>,
    /// Index of the army this general leads
    pub army: usize,
}

impl General {
    pub fn skill(&self, phase: CombatPhase) -> i32 {
        match phase {
            CombatPhase::Default => self.martial,
            CombatPhase::Fire => self.fire,
            CombatPhase::Shock => self.shock,
        }
    }
}

/// Cohort properties grouped into pools, waiting for the army to arrive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedReserve {
    pub front: Vec<Arc<CohortProperties>>,
    pub flank: Vec<Arc<CohortProperties>>,
    pub support: Vec<Arc<CohortProperties>>,
}

impl SortedReserve {
    pub fn len(&self) -> usize {
        self.front.len() + self.flank.len() + self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An army converted for combat.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatArmy {
    /// Position in the side definition
    pub index: usize,
    pub name: String,
    pub country: String,
    pub general: General,
    pub arrival: u32,
    pub flank_size: usize,
    pub reserve: SortedReserve,
}

/// Per-side modifiers of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundResults {
    pub phase: CombatPhase,
    pub dice: u8,
    pub terrain_pips: i32,
    pub general_pips: i32,
    pub total_pips: i32,
    pub tactic_bonus: Fixed,
    pub tactic_casualties: Fixed,
    pub daily_multiplier: Fixed,
    pub flank_ratio: Fixed,
    pub flank_ratio_penalty: Fixed,
}

#[derive(Debug, Clone)]
pub struct Side {
    pub kind: SideKind,
    pub alive: bool,
    pub cohorts: Cohorts,
    /// Sorted by general priority, ascending
    pub armies: Vec<CombatArmy>,
    /// Indices (into `armies`) of armies already on the field
    pub deployed_armies: Vec<usize>,
    /// Sorted by priority, ascending
    pub generals: Vec<General>,
    pub dice: DiceSource,
    pub results: RoundResults,
    pub stack_wiped: bool,
    pub retreated: bool,
}

impl Side {
    /// General of the highest-priority deployed army.
    pub fn leading_general(&self) -> Option<&General> {
        self.generals.iter().find(|g| {
            self.deployed_armies
                .iter()
                .any(|&i| self.armies.get(i).is_some_and(|a| a.index == g.army))
        })
    }

    pub fn general_skill(&self, phase: CombatPhase) -> i32 {
        self.leading_general().map_or(0, |g| g.skill(phase))
    }

    /// Definition index of the leading deployed army.
    pub fn leading_army(&self) -> Option<usize> {
        self.deployed_armies
            .first()
            .and_then(|&i| self.armies.get(i))
            .map(|a| a.index)
    }

    /// Largest flank size among deployed armies, at most half the width.
    pub fn flank_size(&self) -> usize {
        let width = self.cohorts.width();
        self.deployed_armies
            .iter()
            .filter_map(|&i| self.armies.get(i))
            .map(|a| a.flank_size)
            .max()
            .unwrap_or(0)
            .min(width / 2)
    }

    pub fn live_count(&self) -> usize {
        self.cohorts.live_ids().len()
    }

    pub fn live_flank_count(&self) -> usize {
        self.cohorts
            .live_ids()
            .into_iter()
            .filter_map(|id| self.cohorts.get(id))
            .filter(|c| c.properties.role == UnitRole::Flank)
            .count()
    }

    /// Every army has arrived.
    pub fn all_deployed(&self) -> bool {
        self.deployed_armies.len() == self.armies.len()
    }
}
