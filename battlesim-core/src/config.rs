use crate::defines;
use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Out-of-range configuration, reported before a battle or analysis starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("DiceMinimum ({min}) must not exceed DiceMaximum ({max})")]
    DiceRange { min: u8, max: u8 },
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("SoftStackWipeLimit ({soft}) must not exceed HardStackWipeLimit ({hard})")]
    StackWipeLimits { soft: f64, hard: f64 },
}

/// Speed/accuracy trade-off of the outcome analyzer.
///
/// Presets map to a `(max_depth, phase_length_multiplier)` pair; `Custom`
/// uses the explicit `MaxDepth` and `PhaseLengthMultiplier` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Performance {
    #[default]
    Custom,
    VeryAccurate,
    Accurate,
    Normal,
    Fast,
    VeryFast,
}

impl Performance {
    pub fn preset(self) -> Option<(usize, f64)> {
        match self {
            Performance::Custom => None,
            Performance::VeryAccurate => Some((6, 1.0)),
            Performance::Accurate => Some((5, 1.0)),
            Performance::Normal => Some((5, 1.5)),
            Performance::Fast => Some((4, 2.0)),
            Performance::VeryFast => Some((3, 3.0)),
        }
    }
}

impl std::str::FromStr for Performance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "custom" => Ok(Performance::Custom),
            "veryaccurate" => Ok(Performance::VeryAccurate),
            "accurate" => Ok(Performance::Accurate),
            "normal" => Ok(Performance::Normal),
            "fast" => Ok(Performance::Fast),
            "veryfast" => Ok(Performance::VeryFast),
            _ => Err(format!(
                "Invalid performance preset: {}. Use custom, very-accurate, accurate, normal, fast or very-fast.",
                s
            )),
        }
    }
}

/// Battle and analysis settings.
///
/// Passed by reference into every engine operation; there is no process-wide
/// settings state. Field names serialize in the collaborator's `PascalCase`
/// vocabulary (`BaseDamage`, `HardStackWipeLimit`, ...). Values are floats at
/// this layer and are converted to [`Fixed`] by the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CombatSettings {
    // === DAMAGE ===
    pub base_damage: f64,
    pub roll_damage: f64,
    pub max_base_damage: f64,
    pub experience_damage_reduction: f64,
    pub strength_lost_multiplier: f64,
    pub morale_lost_multiplier: f64,
    /// Share of primary damage dealt to the target's support cohort
    pub support_damage: f64,
    pub daily_damage_increase: f64,
    pub daily_morale_loss: f64,

    // === DICE ===
    pub dice_minimum: u8,
    pub dice_maximum: u8,
    /// Rounds per combat phase (dice are rerolled at every phase start)
    pub roll_frequency: u32,
    /// Alternate fire and shock phases instead of a single default phase
    pub fire_and_shock: bool,
    /// Terrain roll modifiers are credited to the defender
    pub defender_advantage: bool,

    // === FRONTLINE ===
    pub combat_width: i32,
    pub back_row: bool,
    pub custom_deployment: bool,
    pub fix_targeting: bool,
    pub flank_ratio: f64,
    pub flank_ratio_penalty: f64,

    // === DEFEAT ===
    pub minimum_morale: f64,
    pub minimum_strength: f64,
    pub stackwiping: bool,
    pub hard_stack_wipe_limit: f64,
    pub soft_stack_wipe_limit: f64,
    pub stackwipe_rounds: u32,
    /// Safety cap for `run_battle`
    pub max_rounds: u32,

    // === ANALYSIS ===
    pub chunk_size: i64,
    pub max_depth: i64,
    pub phase_length_multiplier: f64,
    pub reduce_rolls_depth: usize,
    pub performance: Performance,
    /// Evaluate the nodes of a chunk on the rayon pool
    pub parallel: bool,
    pub calculate_win_chance: bool,
    pub calculate_casualties: bool,
    pub calculate_resource_losses: bool,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            base_damage: defines::damage::BASE_DAMAGE,
            roll_damage: defines::damage::ROLL_DAMAGE,
            max_base_damage: defines::damage::MAX_BASE_DAMAGE,
            experience_damage_reduction: defines::damage::EXPERIENCE_DAMAGE_REDUCTION,
            strength_lost_multiplier: defines::damage::STRENGTH_LOST_MULTIPLIER,
            morale_lost_multiplier: defines::damage::MORALE_LOST_MULTIPLIER,
            support_damage: defines::damage::SUPPORT_DAMAGE,
            daily_damage_increase: defines::damage::DAILY_DAMAGE_INCREASE,
            daily_morale_loss: defines::damage::DAILY_MORALE_LOSS,

            dice_minimum: defines::dice::DICE_MINIMUM,
            dice_maximum: defines::dice::DICE_MAXIMUM,
            roll_frequency: defines::dice::ROLL_FREQUENCY,
            fire_and_shock: false,
            defender_advantage: true,

            combat_width: defines::frontline::COMBAT_WIDTH,
            back_row: false,
            custom_deployment: false,
            fix_targeting: true,
            flank_ratio: defines::frontline::FLANK_RATIO,
            flank_ratio_penalty: defines::frontline::FLANK_RATIO_PENALTY,

            minimum_morale: defines::defeat::MINIMUM_MORALE,
            minimum_strength: defines::defeat::MINIMUM_STRENGTH,
            stackwiping: true,
            hard_stack_wipe_limit: defines::defeat::HARD_STACK_WIPE_LIMIT,
            soft_stack_wipe_limit: defines::defeat::SOFT_STACK_WIPE_LIMIT,
            stackwipe_rounds: defines::defeat::STACKWIPE_ROUNDS,
            max_rounds: 1000,

            chunk_size: defines::analysis::CHUNK_SIZE as i64,
            max_depth: defines::analysis::MAX_DEPTH as i64,
            phase_length_multiplier: defines::analysis::PHASE_LENGTH_MULTIPLIER,
            reduce_rolls_depth: defines::analysis::REDUCE_ROLLS_DEPTH,
            performance: Performance::Custom,
            parallel: false,
            calculate_win_chance: true,
            calculate_casualties: true,
            calculate_resource_losses: true,
        }
    }
}

impl CombatSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings for internal consistency.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.dice_minimum > self.dice_maximum {
            return Err(SettingsError::DiceRange {
                min: self.dice_minimum,
                max: self.dice_maximum,
            });
        }

        let positive = [
            ("RollFrequency", self.roll_frequency as f64),
            ("ChunkSize", self.chunk_size as f64),
            ("MaxDepth", self.max_depth as f64),
            ("PhaseLengthMultiplier", self.phase_length_multiplier),
            ("HardStackWipeLimit", self.hard_stack_wipe_limit),
            ("SoftStackWipeLimit", self.soft_stack_wipe_limit),
            ("MaxRounds", self.max_rounds as f64),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(SettingsError::NotPositive { name, value });
            }
        }

        let non_negative = [
            ("BaseDamage", self.base_damage),
            ("RollDamage", self.roll_damage),
            ("MaxBaseDamage", self.max_base_damage),
            ("ExperienceDamageReduction", self.experience_damage_reduction),
            ("StrengthLostMultiplier", self.strength_lost_multiplier),
            ("MoraleLostMultiplier", self.morale_lost_multiplier),
            ("SupportDamage", self.support_damage),
            ("DailyDamageIncrease", self.daily_damage_increase),
            ("DailyMoraleLoss", self.daily_morale_loss),
            ("MinimumMorale", self.minimum_morale),
            ("MinimumStrength", self.minimum_strength),
            ("FlankRatio", self.flank_ratio),
            ("FlankRatioPenalty", self.flank_ratio_penalty),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(SettingsError::Negative { name, value });
            }
        }

        if self.soft_stack_wipe_limit > self.hard_stack_wipe_limit {
            return Err(SettingsError::StackWipeLimits {
                soft: self.soft_stack_wipe_limit,
                hard: self.hard_stack_wipe_limit,
            });
        }

        Ok(())
    }

    pub fn base_damage(&self) -> Fixed {
        Fixed::from_f64(self.base_damage)
    }

    pub fn roll_damage(&self) -> Fixed {
        Fixed::from_f64(self.roll_damage)
    }

    pub fn max_base_damage(&self) -> Fixed {
        Fixed::from_f64(self.max_base_damage)
    }

    pub fn strength_lost_multiplier(&self) -> Fixed {
        Fixed::from_f64(self.strength_lost_multiplier).non_negative()
    }

    pub fn morale_lost_multiplier(&self) -> Fixed {
        Fixed::from_f64(self.morale_lost_multiplier).non_negative()
    }

    pub fn support_damage(&self) -> Fixed {
        Fixed::from_f64(self.support_damage).clamp_unit()
    }

    pub fn minimum_morale(&self) -> Fixed {
        Fixed::from_f64(self.minimum_morale).non_negative()
    }

    pub fn minimum_strength(&self) -> Fixed {
        Fixed::from_f64(self.minimum_strength).non_negative()
    }

    /// Number of distinct die faces per side.
    pub fn dice_count(&self) -> usize {
        (self.dice_maximum.saturating_sub(self.dice_minimum)) as usize + 1
    }

    /// Branch depth limit after applying the performance preset.
    pub fn analysis_depth(&self) -> usize {
        match self.performance.preset() {
            Some((depth, _)) => depth,
            None => self.max_depth.max(1) as usize,
        }
    }

    /// Rounds between analyzer branch points.
    pub fn analysis_phase_length(&self) -> u32 {
        let multiplier = match self.performance.preset() {
            Some((_, multiplier)) => multiplier,
            None => self.phase_length_multiplier,
        };
        ((self.roll_frequency as f64 * multiplier).round() as u32).max(1)
    }

    pub fn analysis_chunk_size(&self) -> usize {
        self.chunk_size.max(1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = CombatSettings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.dice_count(), 6);
    }

    #[test]
    fn test_negative_max_depth_is_rejected() {
        let settings = CombatSettings {
            max_depth: -1,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NotPositive { name: "MaxDepth", .. })
        ));
    }

    #[test]
    fn test_inverted_dice_range_is_rejected() {
        let settings = CombatSettings {
            dice_minimum: 6,
            dice_maximum: 1,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::DiceRange { min: 6, max: 1 })
        );
    }

    #[test]
    fn test_soft_limit_above_hard_is_rejected() {
        let settings = CombatSettings {
            soft_stack_wipe_limit: 20.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::StackWipeLimits { .. })
        ));
    }

    #[test]
    fn test_performance_presets() {
        let settings = CombatSettings {
            performance: Performance::Fast,
            max_depth: 99,
            ..Default::default()
        };
        assert_eq!(settings.analysis_depth(), 4);
        assert_eq!(settings.analysis_phase_length(), 10);

        let custom = CombatSettings {
            max_depth: 3,
            phase_length_multiplier: 1.0,
            ..Default::default()
        };
        assert_eq!(custom.analysis_depth(), 3);
        assert_eq!(custom.analysis_phase_length(), 5);
    }

    #[test]
    fn test_performance_from_str() {
        assert_eq!("very-fast".parse::<Performance>(), Ok(Performance::VeryFast));
        assert_eq!("Normal".parse::<Performance>(), Ok(Performance::Normal));
        assert!("warp".parse::<Performance>().is_err());
    }

    #[test]
    fn test_settings_deserialize_pascal_case() {
        let json = r#"{ "BaseDamage": 0.2, "HardStackWipeLimit": 5.0, "FixTargeting": false }"#;
        let settings: CombatSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.base_damage, 0.2);
        assert_eq!(settings.hard_stack_wipe_limit, 5.0);
        assert!(!settings.fix_targeting);
        // Unspecified fields keep their defaults
        assert_eq!(settings.roll_damage, defines::damage::ROLL_DAMAGE);
    }
}
