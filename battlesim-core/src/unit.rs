//! External definitions consumed by the engine.
//!
//! Everything in here arrives already resolved (technology and modifiers
//! applied) from the collaborator that edits armies. The engine never mutates
//! these types; [`crate::deployment`] converts them into cohorts.

use crate::defines;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Index of a unit type inside a [`UnitCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeId(pub u16);

/// Deployment role. Also names the reserve pool a cohort waits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitRole {
    #[default]
    Front,
    Flank,
    Support,
}

impl UnitRole {
    pub fn default_maneuver(self) -> u8 {
        match self {
            UnitRole::Flank => defines::frontline::FLANK_MANEUVER,
            UnitRole::Front | UnitRole::Support => defines::frontline::BASE_MANEUVER,
        }
    }
}

/// Static combat properties of one unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitDefinition {
    pub name: String,
    pub role: UnitRole,
    pub max_morale: f64,
    pub max_strength: f64,
    /// 0.0 to 1.0
    pub experience: f64,
    /// Flanking reach in columns. `None` uses the role default.
    pub maneuver: Option<u8>,
    pub damage_done: f64,
    pub strength_damage_done: f64,
    pub morale_damage_done: f64,
    /// Fraction of incoming damage negated
    pub damage_taken: f64,
    /// Damage multiplier in fire phases
    pub fire: f64,
    /// Damage multiplier in shock phases
    pub shock: f64,
    /// Damage multiplier against named enemy unit types
    pub versus: FxHashMap<String, f64>,
    pub cost: f64,
    pub maintenance: f64,
    /// Probability that an enemy cohort defeated by this unit is captured
    pub capture_chance: f64,
}

impl Default for UnitDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: UnitRole::Front,
            max_morale: 3.0,
            max_strength: 1.0,
            experience: 0.0,
            maneuver: None,
            damage_done: 1.0,
            strength_damage_done: 1.0,
            morale_damage_done: 1.0,
            damage_taken: 0.0,
            fire: 1.0,
            shock: 1.0,
            versus: FxHashMap::default(),
            cost: 0.0,
            maintenance: 0.0,
            capture_chance: 0.0,
        }
    }
}

impl UnitDefinition {
    pub fn maneuver(&self) -> u8 {
        self.maneuver.unwrap_or_else(|| self.role.default_maneuver())
    }

    pub fn versus(&self, enemy: &str) -> f64 {
        self.versus.get(enemy).copied().unwrap_or(1.0)
    }
}

/// Lookup table from unit type names to definitions.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: Vec<UnitDefinition>,
    by_name: FxHashMap<String, UnitTypeId>,
}

impl UnitCatalog {
    pub fn new(units: impl IntoIterator<Item = UnitDefinition>) -> Self {
        let mut catalog = Self::default();
        for unit in units {
            catalog.insert(unit);
        }
        catalog
    }

    /// Add or replace a definition. Replacing keeps the existing id.
    pub fn insert(&mut self, unit: UnitDefinition) -> UnitTypeId {
        if let Some(&id) = self.by_name.get(&unit.name) {
            self.units[id.0 as usize] = unit;
            return id;
        }
        let id = UnitTypeId(self.units.len() as u16);
        self.by_name.insert(unit.name.clone(), id);
        self.units.push(unit);
        id
    }

    pub fn id(&self, name: &str) -> Option<UnitTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: UnitTypeId) -> Option<&UnitDefinition> {
        self.units.get(id.0 as usize)
    }

    /// Resolve a reserve entry. `None` for unknown types.
    pub fn get_combat_unit(&self, name: &str) -> Option<(UnitTypeId, &UnitDefinition)> {
        let id = self.id(name)?;
        self.get(id).map(|unit| (id, unit))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralDefinition {
    pub name: String,
    /// Skill used in the default (non fire/shock) phase
    pub martial: i32,
    pub fire: i32,
    pub shock: i32,
    /// Lower values lead
    pub priority: i32,
    pub tactic: Option<String>,
}

/// Unit-type preferences used when custom deployment is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitPreferences {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub flank: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmyDefinition {
    pub name: String,
    pub country: String,
    pub general: GeneralDefinition,
    /// Round at which the army joins (0 = present from the start)
    pub arrival: u32,
    pub flank_size: usize,
    /// Ordered unit type names
    pub reserve: Vec<String>,
    pub preferences: UnitPreferences,
}

impl Default for ArmyDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            country: String::new(),
            general: GeneralDefinition::default(),
            arrival: 0,
            flank_size: 5,
            reserve: Vec::new(),
            preferences: UnitPreferences::default(),
        }
    }
}

/// Where a side's die rolls come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiceSource {
    /// Seeded roll per phase
    #[default]
    Random,
    Fixed(u8),
    /// One roll per phase, cycling when the list runs out
    PerPhase(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SideDefinition {
    pub armies: Vec<ArmyDefinition>,
    pub dice: DiceSource,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Terrain {
    pub name: String,
    /// Roll modifier (pips)
    pub roll: i32,
    pub combat_width: i32,
    /// Damage multiplier for named unit types fighting on this terrain
    pub unit_damage: FxHashMap<String, f64>,
}

impl Terrain {
    pub fn unit_damage(&self, unit: &str) -> f64 {
        self.unit_damage.get(unit).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tactic {
    pub name: String,
    /// Damage bonus against named enemy tactics
    pub effectiveness: FxHashMap<String, f64>,
    /// Extra strength loss taken by both sides
    pub casualties: f64,
}

impl Tactic {
    pub fn effectiveness_against(&self, enemy: &Tactic) -> f64 {
        self.effectiveness.get(&enemy.name).copied().unwrap_or(0.0)
    }
}
