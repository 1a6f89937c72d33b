//! Float8 E4M3FN Encoding
//!
//! Closed-form conversion between `f32` and the 8-bit E4M3FN floating point
//! format: 1 sign bit, 4 exponent bits (bias 7), 3 mantissa bits, no
//! infinities and a single NaN mantissa pattern (`S.1111.111`).
//!
//! Conversion rounds to nearest with ties to even and saturates out-of-range
//! finite values (and infinities) to the largest finite magnitude, 448.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

const SIGN_MASK: u8 = 0x80;
const MAGNITUDE_MASK: u8 = 0x7F;
const EXPONENT_BIAS: i32 = 7;
const MANTISSA_BITS: u32 = 3;

/// Largest finite E4M3FN magnitude.
const MAX_FINITE: f32 = 448.0;

/// Smallest normal E4M3FN magnitude (2^-6).
const MIN_NORMAL: f32 = 0.015625;

/// Value of one subnormal step (2^-9).
const SUBNORMAL_STEP: f32 = 0.001953125;

// =============================================================================
// Float8E4M3Fn
// =============================================================================

/// An 8-bit E4M3FN floating point code.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Float8E4M3Fn(u8);

impl Float8E4M3Fn {
    /// Positive zero.
    pub const ZERO: Self = Self(0x00);

    /// Canonical NaN.
    pub const NAN: Self = Self(0x7F);

    /// Largest finite value (448).
    pub const MAX: Self = Self(0x7E);

    /// Smallest finite value (-448).
    pub const MIN: Self = Self(0xFE);

    /// Creates a code from its raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bits of this code.
    pub const fn to_bits(self) -> u8 {
        self.0
    }

    /// Returns true if the low 7 bits hold the NaN pattern.
    pub const fn is_nan(self) -> bool {
        self.0 & MAGNITUDE_MASK == MAGNITUDE_MASK
    }

    /// Returns true if this code encodes positive or negative zero.
    pub const fn is_zero(self) -> bool {
        self.0 & MAGNITUDE_MASK == 0
    }

    /// Encodes an `f32`, rounding to nearest even and saturating to +/-448.
    pub fn from_f32(value: f32) -> Self {
        let sign = ((value.to_bits() >> 24) as u8) & SIGN_MASK;

        if value.is_nan() {
            return Self(sign | Self::NAN.0);
        }

        let magnitude = value.abs();
        if magnitude > MAX_FINITE {
            return Self(sign | Self::MAX.0);
        }

        if magnitude < MIN_NORMAL {
            // Scaling by a power of two is exact, so only one rounding happens.
            // A result of 8 carries into the smallest normal code, 0x08.
            let steps = (magnitude / SUBNORMAL_STEP).round_ties_even() as u8;
            return Self(sign | steps);
        }

        let bits = magnitude.to_bits();
        let exponent = ((bits >> 23) & 0xFF) as i32 - 127 + EXPONENT_BIAS;
        let fraction = bits & 0x007F_FFFF;

        let shift = 23 - MANTISSA_BITS;
        let mut mantissa = fraction >> shift;
        let remainder = fraction & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        if remainder > halfway || (remainder == halfway && mantissa & 1 == 1) {
            mantissa += 1;
        }

        // Mantissa overflow carries into the exponent field.
        let code = ((exponent as u32) << MANTISSA_BITS) + mantissa;
        let code = code.min(u32::from(Self::MAX.0)) as u8;
        Self(sign | code)
    }

    /// Decodes this code to `f32`.
    pub fn to_f32(self) -> f32 {
        if self.is_nan() {
            return f32::NAN;
        }

        let sign = if self.0 & SIGN_MASK != 0 { -1.0 } else { 1.0 };
        let exponent = i32::from((self.0 & MAGNITUDE_MASK) >> MANTISSA_BITS);
        let mantissa = f32::from(self.0 & 0x07);

        let magnitude = if exponent == 0 {
            mantissa * SUBNORMAL_STEP
        } else {
            (1.0 + mantissa / 8.0) * 2f32.powi(exponent - EXPONENT_BIAS)
        };
        sign * magnitude
    }

    /// Iterates over every finite value of the format (all 256 codes minus the two NaNs).
    pub fn finite_values() -> impl Iterator<Item = f32> {
        (0..=u8::MAX)
            .map(Self::from_bits)
            .filter(|code| !code.is_nan())
            .map(Self::to_f32)
    }
}

impl From<f32> for Float8E4M3Fn {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl From<Float8E4M3Fn> for f32 {
    fn from(value: Float8E4M3Fn) -> Self {
        value.to_f32()
    }
}

impl fmt::Debug for Float8E4M3Fn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Float8E4M3Fn({:#04x} = {})", self.0, self.to_f32())
    }
}

impl fmt::Display for Float8E4M3Fn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

// =============================================================================
// Tests
// =============================================================================
