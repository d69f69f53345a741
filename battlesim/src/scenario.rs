use anyhow::{bail, Context, Result};
use battlesim_core::{
    build_battle, Battle, CombatSettings, SideDefinition, Tactic, Terrain, UnitCatalog,
    UnitDefinition,
};
use serde::Deserialize;
use std::path::Path;

/// Everything needed to set up one battle, as read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub units: Vec<UnitDefinition>,
    pub tactics: Vec<Tactic>,
    pub terrains: Vec<Terrain>,
    pub attacker: SideDefinition,
    pub defender: SideDefinition,
    pub settings: CombatSettings,
}

impl Scenario {
    /// Every reserve entry must name a known unit type.
    fn check_units(&self, catalog: &UnitCatalog) -> Result<()> {
        for (label, side) in [("attacker", &self.attacker), ("defender", &self.defender)] {
            if side.armies.is_empty() {
                bail!("{} has no armies", label);
            }
            for army in &side.armies {
                for unit in &army.reserve {
                    if catalog.id(unit).is_none() {
                        bail!("{} army '{}': unknown unit type '{}'", label, army.name, unit);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn build(&self, seed: Option<u64>) -> Result<Battle> {
        let catalog = UnitCatalog::new(self.units.iter().cloned());
        self.check_units(&catalog)?;
        Ok(build_battle(
            &self.attacker,
            &self.defender,
            &catalog,
            &self.terrains,
            &self.tactics,
            &self.settings,
            seed,
        ))
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    log::info!("Loading scenario from {:?}", path);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
    log::info!(
        "Scenario: {} unit types, {} terrains, {} vs {} armies",
        scenario.units.len(),
        scenario.terrains.len(),
        scenario.attacker.armies.len(),
        scenario.defender.armies.len()
    );
    Ok(scenario)
}
