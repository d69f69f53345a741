use crate::cohort::CombatPhase;
use crate::config::CombatSettings;
use crate::side::SideKind;
use crate::unit::DiceSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Zero-based combat phase of a round. Round 1 starts phase 0.
pub fn phase_index(round: i32, settings: &CombatSettings) -> u32 {
    (round - 1).max(0) as u32 / settings.roll_frequency.max(1)
}

pub fn phase_kind(phase: u32, settings: &CombatSettings) -> CombatPhase {
    if !settings.fire_and_shock {
        CombatPhase::Default
    } else if phase % 2 == 0 {
        CombatPhase::Fire
    } else {
        CombatPhase::Shock
    }
}

/// Die value of a side for a phase, inside `[DiceMinimum, DiceMaximum]`.
///
/// Random rolls are a pure function of `(seed, phase, side)`, so every round
/// of a phase sees the same value and replays are exact.
pub fn roll(
    source: &DiceSource,
    seed: u64,
    phase: u32,
    side: SideKind,
    settings: &CombatSettings,
) -> u8 {
    let min = settings.dice_minimum;
    let max = settings.dice_maximum.max(min);
    match source {
        DiceSource::Random => {
            let stream = ((phase as u64) << 1) | side.index() as u64;
            let mut rng = StdRng::seed_from_u64(seed ^ stream);
            rng.gen_range(min..=max)
        }
        DiceSource::Fixed(value) => (*value).clamp(min, max),
        DiceSource::PerPhase(values) => {
            if values.is_empty() {
                return min;
            }
            values[phase as usize % values.len()].clamp(min, max)
        }
    }
}
