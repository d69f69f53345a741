//! Branch weighting strategies.
//!
//! A strategy decides which dice combinations a node branches into and how
//! much probability mass each one carries. The only hard requirement is that
//! the fractions of one weight index sum to 1, which keeps the analyzer's
//! outcome buckets normalised.

use crate::config::CombatSettings;

/// One dice combination a node branches into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub attacker_roll: u8,
    pub defender_roll: u8,
    /// Share of the parent's weight, in (0, 1]
    pub fraction: f64,
}

pub trait BranchWeighting: Send + Sync {
    /// Row of the branch table used for the children of a node at `depth`.
    fn weight_index(&self, depth: usize, settings: &CombatSettings) -> usize;

    /// Branches for a weight index. Fractions must sum to 1.
    fn branches(&self, weight_index: usize, settings: &CombatSettings) -> Vec<Branch>;

    fn name(&self) -> &str;
}

/// Every die pair while shallow, then dice paired into buckets.
///
/// With dice 1..=6 the reduced grid rolls 2, 4 and 6, each standing in for
/// two faces, so deep levels branch 9 ways instead of 36.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReducedRolls;

impl ReducedRolls {
    pub const FULL: usize = 0;
    pub const REDUCED: usize = 1;

    /// `(representative roll, faces covered)` per side.
    fn faces(weight_index: usize, settings: &CombatSettings) -> Vec<(u8, usize)> {
        let min = settings.dice_minimum;
        let max = settings.dice_maximum.max(min);
        let dice: Vec<u8> = (min..=max).collect();
        if weight_index == Self::FULL {
            return dice.into_iter().map(|d| (d, 1)).collect();
        }
        dice.chunks(2)
            .map(|bucket| {
                let lo = bucket[0] as u16;
                let hi = bucket[bucket.len() - 1] as u16;
                // Rounded half up
                (((lo + hi + 1) / 2) as u8, bucket.len())
            })
            .collect()
    }
}

impl BranchWeighting for ReducedRolls {
    fn weight_index(&self, depth: usize, settings: &CombatSettings) -> usize {
        if depth < settings.reduce_rolls_depth {
            Self::FULL
        } else {
            Self::REDUCED
        }
    }

    fn branches(&self, weight_index: usize, settings: &CombatSettings) -> Vec<Branch> {
        let faces = Self::faces(weight_index, settings);
        let total: usize = faces.iter().map(|&(_, n)| n).sum();
        let total = total as f64;

        let mut branches = Vec::with_capacity(faces.len() * faces.len());
        for &(attacker_roll, a) in &faces {
            for &(defender_roll, d) in &faces {
                branches.push(Branch {
                    attacker_roll,
                    defender_roll,
                    fraction: (a as f64 / total) * (d as f64 / total),
                });
            }
        }
        branches
    }

    fn name(&self) -> &str {
        "ReducedRolls"
    }
}

/// Full cartesian product at every depth. Exact but slow.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllRolls;

impl BranchWeighting for AllRolls {
    fn weight_index(&self, _depth: usize, _settings: &CombatSettings) -> usize {
        ReducedRolls::FULL
    }

    fn branches(&self, _weight_index: usize, settings: &CombatSettings) -> Vec<Branch> {
        ReducedRolls.branches(ReducedRolls::FULL, settings)
    }

    fn name(&self) -> &str {
        "AllRolls"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(branches: &[Branch]) -> f64 {
        branches.iter().map(|b| b.fraction).sum()
    }

    #[test]
    fn test_full_grid() {
        let settings = CombatSettings::default();
        let branches = ReducedRolls.branches(ReducedRolls::FULL, &settings);
        assert_eq!(branches.len(), 36);
        assert!((sum(&branches) - 1.0).abs() < 1e-12);
        assert_eq!(branches[0].attacker_roll, 1);
        assert_eq!(branches[35].defender_roll, 6);
    }

    #[test]
    fn test_reduced_grid() {
        let settings = CombatSettings::default();
        let branches = ReducedRolls.branches(ReducedRolls::REDUCED, &settings);
        assert_eq!(branches.len(), 9);
        let rolls: Vec<u8> = branches.iter().take(3).map(|b| b.defender_roll).collect();
        assert_eq!(rolls, vec![2, 4, 6]);
        assert!((sum(&branches) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_odd_dice_count_keeps_normalisation() {
        let settings = CombatSettings {
            dice_minimum: 1,
            dice_maximum: 5,
            ..Default::default()
        };
        let branches = ReducedRolls.branches(ReducedRolls::REDUCED, &settings);
        // Buckets {1,2}, {3,4}, {5}
        assert_eq!(branches.len(), 9);
        assert_eq!(branches[8].attacker_roll, 5);
        assert!((branches[8].fraction - 1.0 / 25.0).abs() < 1e-12);
        assert!((sum(&branches) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_index_by_depth() {
        let settings = CombatSettings {
            reduce_rolls_depth: 2,
            ..Default::default()
        };
        assert_eq!(ReducedRolls.weight_index(0, &settings), ReducedRolls::FULL);
        assert_eq!(ReducedRolls.weight_index(1, &settings), ReducedRolls::FULL);
        assert_eq!(ReducedRolls.weight_index(2, &settings), ReducedRolls::REDUCED);
        assert_eq!(AllRolls.weight_index(9, &settings), ReducedRolls::FULL);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_fractions_sum_to_one(min in 1..6u8, span in 0..8u8, index in 0..2usize) {
            let settings = CombatSettings {
                dice_minimum: min,
                dice_maximum: min + span,
                ..Default::default()
            };
            let branches = ReducedRolls.branches(index, &settings);
            prop_assert!(!branches.is_empty());
            prop_assert!((sum(&branches) - 1.0).abs() < 1e-9);
            for b in &branches {
                prop_assert!(b.attacker_roll >= min && b.attacker_roll <= min + span);
            }
        }
    }
}
