//! Fixed-point arithmetic for deterministic combat resolution.
//!
//! Morale, strength and every damage term use this type so that two runs over
//! the same battle produce bit-identical cohort states on any platform.
//! Floats are only allowed at the parse layer (settings, unit definitions) and
//! in the analyzer's probability weights.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Fixed-point value with scale 100 000.
///
/// Represents decimal values as integers: 0.096 → 9 600, 1.0 → 100 000.
/// Uses i64 storage with i128 intermediates so products of several combat
/// multipliers cannot overflow.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed(pub i64);

impl Fixed {
    /// Scale factor: 100 000 = 1.0
    pub const SCALE: i64 = 100_000;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(100_000);
    pub const HALF: Fixed = Fixed(50_000);

    /// Create from raw scaled value
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Create from integer (e.g., 5 → 500 000)
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Fixed(v * Self::SCALE)
    }

    /// Convert from f64 (parse layer only, not in combat logic).
    ///
    /// Uses `.round()` for cross-platform determinism. NaN/Inf map to zero,
    /// out-of-range values saturate.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        if !v.is_finite() {
            return Fixed::ZERO;
        }

        let scaled = v * Self::SCALE as f64;

        if scaled >= i64::MAX as f64 {
            return Fixed(i64::MAX);
        }
        if scaled <= i64::MIN as f64 {
            return Fixed(i64::MIN);
        }

        Fixed(scaled.round() as i64)
    }

    /// Convert to f64 (statistics and display only)
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Raw integer value
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Returns the smaller of two Fixed values (deterministic)
    #[inline]
    pub fn min(self, other: Fixed) -> Fixed {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Returns the larger of two Fixed values (deterministic)
    #[inline]
    pub fn max(self, other: Fixed) -> Fixed {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn clamp(self, lo: Fixed, hi: Fixed) -> Fixed {
        self.max(lo).min(hi)
    }

    /// Clamp into [0, 1]. Every ratio goes through this before it is used as
    /// a multiplier.
    #[inline]
    pub fn clamp_unit(self) -> Fixed {
        self.clamp(Fixed::ZERO, Fixed::ONE)
    }

    /// Clamp at zero from below (multipliers are never negative).
    #[inline]
    pub fn non_negative(self) -> Fixed {
        self.max(Fixed::ZERO)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0 + other.0)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Fixed) {
        self.0 += other.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0 - other.0)
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Fixed) {
        self.0 -= other.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, other: Fixed) -> Fixed {
        Fixed((self.0 as i128 * other.0 as i128 / Fixed::SCALE as i128) as i64)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, other: Fixed) -> Fixed {
        if other.0 == 0 {
            return Fixed::ZERO; // Safe default for division by zero
        }
        Fixed((self.0 as i128 * Fixed::SCALE as i128 / other.0 as i128) as i64)
    }
}

impl std::iter::Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Fixed {
        iter.fold(Fixed::ZERO, |acc, v| acc + v)
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f64())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Fixed::ZERO.0, 0);
        assert_eq!(Fixed::ONE.0, 100_000);
        assert_eq!(Fixed::HALF.0, 50_000);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Fixed::from_f64(0.25), Fixed(25_000));
        assert_eq!(Fixed::from_f64(1.0), Fixed::ONE);
        assert_eq!(Fixed::from_f64(0.096), Fixed(9_600));
        assert_eq!(Fixed::from_f64(0.024), Fixed(2_400));
    }

    #[test]
    fn test_from_f64_edge_cases() {
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(f64::INFINITY), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(1e30), Fixed(i64::MAX));
        assert_eq!(Fixed::from_f64(-1e30), Fixed(i64::MIN));
    }

    #[test]
    fn test_multiply_and_divide() {
        assert_eq!(Fixed::from_int(2) * Fixed::from_int(3), Fixed::from_int(6));
        assert_eq!(Fixed::HALF * Fixed::HALF, Fixed(25_000));
        assert_eq!(Fixed::from_int(6) / Fixed::from_int(2), Fixed::from_int(3));
        assert_eq!(Fixed::ONE / Fixed::ZERO, Fixed::ZERO);
    }

    #[test]
    fn test_clamps() {
        assert_eq!(Fixed::from_f64(1.7).clamp_unit(), Fixed::ONE);
        assert_eq!(Fixed::from_f64(-0.3).clamp_unit(), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(-0.3).non_negative(), Fixed::ZERO);
        assert_eq!(Fixed::HALF.clamp_unit(), Fixed::HALF);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn game_value() -> impl Strategy<Value = i64> {
            -1_000_000..=1_000_000i64
        }

        proptest! {
            /// Multiplication is commutative (a × b = b × a)
            #[test]
            fn mul_is_commutative(a in game_value(), b in game_value()) {
                let x = Fixed::from_int(a);
                let y = Fixed::from_int(b);
                prop_assert_eq!(x * y, y * x);
            }

            #[test]
            fn mul_one_is_identity(a in game_value()) {
                let x = Fixed::from_int(a);
                prop_assert_eq!(x * Fixed::ONE, x);
            }

            #[test]
            fn clamp_unit_stays_in_range(raw in any::<i64>()) {
                let v = Fixed(raw).clamp_unit();
                prop_assert!(v >= Fixed::ZERO && v <= Fixed::ONE);
            }

            #[test]
            fn from_f64_never_panics(f in proptest::num::f64::ANY) {
                let _ = Fixed::from_f64(f);
            }
        }
    }
}
