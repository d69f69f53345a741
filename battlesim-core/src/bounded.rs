use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// A value clamped to a Fixed-point range.
/// Used for cohort morale (0 to max morale) and strength (0 to max strength).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedFixed {
    value: Fixed,
    min: Fixed,
    max: Fixed,
}

impl BoundedFixed {
    pub const fn new(value: Fixed, min: Fixed, max: Fixed) -> Self {
        let value = if value.raw() < min.raw() {
            min
        } else if value.raw() > max.raw() {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    /// Full value in `[0, max]`.
    pub fn full(max: Fixed) -> Self {
        let max = max.non_negative();
        Self::new(max, Fixed::ZERO, max)
    }

    pub fn get(&self) -> Fixed {
        self.value
    }

    pub fn min(&self) -> Fixed {
        self.min
    }

    pub fn max(&self) -> Fixed {
        self.max
    }

    pub fn add(&mut self, delta: Fixed) {
        self.value = (self.value + delta).max(self.min).min(self.max);
    }

    /// Subtract a loss; returns the amount actually removed.
    pub fn take(&mut self, loss: Fixed) -> Fixed {
        let before = self.value;
        self.add(-loss.non_negative());
        before - self.value
    }

    pub fn set(&mut self, value: Fixed) {
        self.value = value.max(self.min).min(self.max);
    }

    pub fn zero(&mut self) {
        self.set(Fixed::ZERO);
    }

    /// Ratio from 0.0 to 1.0 as Fixed.
    /// Returns 0 if max == min.
    pub fn ratio(&self) -> Fixed {
        let range = self.max - self.min;
        if range == Fixed::ZERO {
            return Fixed::ZERO;
        }
        ((self.value - self.min) / range).clamp_unit()
    }
}
