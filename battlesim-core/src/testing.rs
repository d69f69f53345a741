use crate::battle::Battle;
use crate::cohort::CohortProperties;
use crate::config::CombatSettings;
use crate::deployment::{build_battle, cohort_properties};
use crate::unit::{
    ArmyDefinition, DiceSource, SideDefinition, Tactic, Terrain, UnitCatalog, UnitDefinition,
    UnitRole, UnitTypeId,
};

pub struct UnitBuilder {
    unit: UnitDefinition,
}

impl UnitBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            unit: UnitDefinition {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn role(mut self, role: UnitRole) -> Self {
        self.unit.role = role;
        self
    }

    pub fn max_morale(mut self, value: f64) -> Self {
        self.unit.max_morale = value;
        self
    }

    pub fn max_strength(mut self, value: f64) -> Self {
        self.unit.max_strength = value;
        self
    }

    pub fn cost(mut self, cost: f64, maintenance: f64) -> Self {
        self.unit.cost = cost;
        self.unit.maintenance = maintenance;
        self
    }

    pub fn capture_chance(mut self, chance: f64) -> Self {
        self.unit.capture_chance = chance;
        self
    }

    pub fn build(self) -> UnitDefinition {
        self.unit
    }

    /// Cohort properties with no enemy-specific damage table.
    pub fn properties(self) -> CohortProperties {
        let catalog = UnitCatalog::default();
        cohort_properties(
            UnitTypeId(0),
            &self.unit,
            0,
            "",
            &catalog,
            &[],
            &[],
            &CombatSettings::default(),
        )
    }
}

/// `infantry` (front), `cavalry` (flank) and `archers` (support), all with
/// default combat values.
pub fn default_catalog() -> UnitCatalog {
    UnitCatalog::new([
        UnitBuilder::new("infantry").build(),
        UnitBuilder::new("cavalry").role(UnitRole::Flank).build(),
        UnitBuilder::new("archers").role(UnitRole::Support).build(),
    ])
}

pub fn army(name: &str, reserve: &[&str]) -> ArmyDefinition {
    ArmyDefinition {
        name: name.to_string(),
        reserve: reserve.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Builds battles from [`default_catalog`] units. Both sides start empty;
/// `*_reserve` creates or extends each side's first army.
pub struct BattleBuilder {
    catalog: UnitCatalog,
    settings: CombatSettings,
    attacker: SideDefinition,
    defender: SideDefinition,
    terrains: Vec<Terrain>,
    tactics: Vec<Tactic>,
    seed: Option<u64>,
}

fn first_army<'a>(side: &'a mut SideDefinition, name: &str) -> &'a mut ArmyDefinition {
    if side.armies.is_empty() {
        side.armies.push(army(name, &[]));
    }
    &mut side.armies[0]
}

impl BattleBuilder {
    pub fn new() -> Self {
        Self {
            catalog: default_catalog(),
            settings: CombatSettings::default(),
            attacker: SideDefinition::default(),
            defender: SideDefinition::default(),
            terrains: Vec::new(),
            tactics: Vec::new(),
            seed: None,
        }
    }

    /// Add or replace a unit type.
    pub fn unit(mut self, unit: UnitDefinition) -> Self {
        self.catalog.insert(unit);
        self
    }

    pub fn settings(mut self, settings: CombatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn attacker_reserve(mut self, units: &[&str]) -> Self {
        first_army(&mut self.attacker, "Attackers")
            .reserve
            .extend(units.iter().map(|s| s.to_string()));
        self
    }

    pub fn defender_reserve(mut self, units: &[&str]) -> Self {
        first_army(&mut self.defender, "Defenders")
            .reserve
            .extend(units.iter().map(|s| s.to_string()));
        self
    }

    /// Extra attacker army joining at `arrival`.
    pub fn attacker_army_arriving(mut self, arrival: u32, units: &[&str]) -> Self {
        let mut late = army("Reinforcements", units);
        late.arrival = arrival;
        late.general.priority = self.attacker.armies.len() as i32;
        self.attacker.armies.push(late);
        self
    }

    pub fn attacker_flank_size(mut self, flank_size: usize) -> Self {
        first_army(&mut self.attacker, "Attackers").flank_size = flank_size;
        self
    }

    pub fn attacker_general(mut self, skill: i32, tactic: Option<&str>) -> Self {
        set_general(first_army(&mut self.attacker, "Attackers"), skill, tactic);
        self
    }

    pub fn defender_general(mut self, skill: i32, tactic: Option<&str>) -> Self {
        set_general(first_army(&mut self.defender, "Defenders"), skill, tactic);
        self
    }

    pub fn attacker_dice(mut self, dice: DiceSource) -> Self {
        self.attacker.dice = dice;
        self
    }

    pub fn defender_dice(mut self, dice: DiceSource) -> Self {
        self.defender.dice = dice;
        self
    }

    pub fn tactic(mut self, tactic: Tactic) -> Self {
        self.tactics.push(tactic);
        self
    }

    pub fn terrain(mut self, terrain: Terrain) -> Self {
        self.terrains.push(terrain);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Battle {
        build_battle(
            &self.attacker,
            &self.defender,
            &self.catalog,
            &self.terrains,
            &self.tactics,
            &self.settings,
            self.seed,
        )
    }
}

fn set_general(army: &mut ArmyDefinition, skill: i32, tactic: Option<&str>) {
    army.general.martial = skill;
    army.general.fire = skill;
    army.general.shock = skill;
    army.general.tactic = tactic.map(str::to_string);
}

impl Default for BattleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
