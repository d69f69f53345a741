//! Combat rule constants (defines).
//!
//! These are the default values of [`CombatSettings`](crate::config::CombatSettings).
//! They follow the land combat defines of the ancient-era ruleset; collaborators
//! override them per battle through the settings struct.

/// Damage formula constants
pub mod damage {
    /// Damage dealt before dice and pips are applied
    pub const BASE_DAMAGE: f64 = 0.096;

    /// Extra damage per point of total pips (dice + general + terrain)
    pub const ROLL_DAMAGE: f64 = 0.024;

    /// Upper bound of base damage after pips
    pub const MAX_BASE_DAMAGE: f64 = 0.36;

    /// Fraction of experience that turns into damage reduction
    pub const EXPERIENCE_DAMAGE_REDUCTION: f64 = 0.3;

    /// Multiplier from dealt strength damage to strength lost
    pub const STRENGTH_LOST_MULTIPLIER: f64 = 0.2;

    /// Multiplier from dealt morale damage to morale lost
    pub const MORALE_LOST_MULTIPLIER: f64 = 1.5;

    /// Share of primary damage the target's back-row support cohort takes
    pub const SUPPORT_DAMAGE: f64 = 0.5;

    /// Damage multiplier growth per round (0.01 = +1% per round)
    pub const DAILY_DAMAGE_INCREASE: f64 = 0.01;

    /// Morale every engaged cohort loses per round, as a fraction of max morale
    pub const DAILY_MORALE_LOSS: f64 = 0.0;
}

/// Dice and phase constants
pub mod dice {
    pub const DICE_MINIMUM: u8 = 1;
    pub const DICE_MAXIMUM: u8 = 6;

    /// Rounds between rerolls (one combat phase)
    pub const ROLL_FREQUENCY: u32 = 5;
}

/// Frontline constants
pub mod frontline {
    /// Cells per frontline row
    pub const COMBAT_WIDTH: i32 = 30;

    /// Required share of flank-role cohorts before the flank penalty applies
    pub const FLANK_RATIO: f64 = 0.5;

    /// Maximum support-damage penalty when no flank-role cohorts remain
    pub const FLANK_RATIO_PENALTY: f64 = 0.5;

    /// Default flanking reach for front and support roles
    pub const BASE_MANEUVER: u8 = 1;

    /// Default flanking reach for the flank role
    pub const FLANK_MANEUVER: u8 = 2;
}

/// Defeat and stack wipe constants
pub mod defeat {
    /// Morale at or below which a cohort is defeated
    pub const MINIMUM_MORALE: f64 = 0.25;

    /// Strength at or below which a cohort is defeated
    pub const MINIMUM_STRENGTH: f64 = 0.0;

    /// Strength ratio that wipes a side at any time
    pub const HARD_STACK_WIPE_LIMIT: f64 = 10.0;

    /// Strength ratio that wipes a side during the opening rounds
    pub const SOFT_STACK_WIPE_LIMIT: f64 = 2.0;

    /// Rounds during which the soft limit applies and a rout is a stack wipe
    pub const STACKWIPE_ROUNDS: u32 = 12;
}

/// Outcome analyzer constants
pub mod analysis {
    /// Nodes expanded per chunk before progress is reported
    pub const CHUNK_SIZE: usize = 1000;

    /// Branch depth (in phases) before a battle is counted as incomplete
    pub const MAX_DEPTH: usize = 5;

    /// Analyzer phase length as a multiple of the roll frequency
    pub const PHASE_LENGTH_MULTIPLIER: f64 = 1.0;

    /// Depth from which the coarser dice grid is used
    pub const REDUCE_ROLLS_DEPTH: usize = 2;

    /// Resolution of casualty histograms (buckets per 1.0)
    pub const HISTOGRAM_BUCKETS: f64 = 100.0;
}
