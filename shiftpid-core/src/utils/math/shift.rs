//! Power-of-two gain magnitudes.
//!
//! A `Shift` stands in for a gain constant: applying it to a value is a left
//! shift by its magnitude, i.e. a multiplication by `2^n`. Only magnitudes
//! `0..=12` (factors `1..=4096`) exist, which keeps every shift well inside
//! the width of an `i32`.
//!
//! # Example
//! ```rust
//! use shiftpid_core::utils::math::shift::Shift;
//! let kp = Shift::try_from(3).unwrap();
//! assert_eq!(kp, Shift::X8);
//! assert_eq!(kp.apply(5), 40);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Power-of-two multiplier expressed as a left-shift amount.
///
/// Serialized as the raw magnitude (`0..=12`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Shift {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
    X256 = 8,
    X512 = 9,
    X1024 = 10,
    X2048 = 11,
    X4096 = 12,
}

/// Magnitude outside `0..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidShift(pub u8);

impl fmt::Display for InvalidShift {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "shift magnitude {} out of range 0..={}", self.0, Shift::MAX.magnitude())
    }
}

impl Shift {
    /// Largest supported magnitude.
    pub const MAX: Shift = Shift::X4096;

    /// Every magnitude in ascending order.
    pub const ALL: [Shift; 13] = [
        Shift::X1,
        Shift::X2,
        Shift::X4,
        Shift::X8,
        Shift::X16,
        Shift::X32,
        Shift::X64,
        Shift::X128,
        Shift::X256,
        Shift::X512,
        Shift::X1024,
        Shift::X2048,
        Shift::X4096,
    ];

    /// Shift amount in bits.
    pub const fn magnitude(self) -> u8 {
        self as u8
    }

    /// Multiplier this shift represents (`2^magnitude`).
    pub const fn factor(self) -> i32 {
        1 << self.magnitude()
    }

    /// Scale `value` up by this shift, wrapping on overflow.
    #[inline]
    pub const fn apply(
        self,
        value: i32,
    ) -> i32 {
        value.wrapping_shl(self.magnitude() as u32)
    }

    /// Scale `value` down by this shift (arithmetic, rounds toward negative infinity).
    #[inline]
    pub const fn unapply(
        self,
        value: i32,
    ) -> i32 {
        value >> self.magnitude()
    }
}

impl TryFrom<u8> for Shift {
    type Error = InvalidShift;

    fn try_from(magnitude: u8) -> Result<Self, Self::Error> {
        Shift::ALL
            .get(usize::from(magnitude))
            .copied()
            .ok_or(InvalidShift(magnitude))
    }
}

impl From<Shift> for u8 {
    fn from(shift: Shift) -> u8 {
        shift.magnitude()
    }
}

impl fmt::Display for Shift {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "x{}", self.factor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitudes_match_position() {
        for (i, shift) in Shift::ALL.iter().enumerate() {
            assert_eq!(shift.magnitude() as usize, i);
            assert_eq!(shift.factor(), 1 << i);
        }
    }

    #[test]
    fn test_try_from_range() {
        assert_eq!(Shift::try_from(0), Ok(Shift::X1));
        assert_eq!(Shift::try_from(10), Ok(Shift::X1024));
        assert_eq!(Shift::try_from(12), Ok(Shift::X4096));
        assert_eq!(Shift::try_from(13), Err(InvalidShift(13)));
        assert_eq!(Shift::try_from(255), Err(InvalidShift(255)));
    }

    #[test]
    fn test_apply_negative_values() {
        assert_eq!(Shift::X4.apply(-3), -12);
        // arithmetic shift floors
        assert_eq!(Shift::X4.unapply(-3), -1);
        assert_eq!(Shift::X1.unapply(-3), -3);
    }
}
