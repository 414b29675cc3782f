//! Quantization policy: what happens to bits that no longer fit.
//!
//! `resize` is the only lossy operator in the library. Its behavior is
//! controlled by two small enums whose numeric values double as the wire
//! encoding, plus [`QuantizePolicy`] bundling the pair for configuration
//! and the array helpers.

use crate::error::FpError;
use serde::{Deserialize, Serialize};

/// What to do when a resized value exceeds the target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OverflowMode {
    /// Keep the low bits of the field, reinterpreting the sign bit.
    Wrap = 0,
    /// Clamp to the nearest representable endpoint.
    Saturate = 1,
    /// Refuse: `resize` returns [`FpError::Overflow`].
    Exception = 2,
}

/// How to dispose of fractional bits dropped by a resize.
///
/// Mirrors the VHDL resize vocabulary: `Near*` modes round to the nearest
/// representable value with the named tie-break, `Direct*` modes always
/// round toward the named direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoundMode {
    /// Nearest; ties toward +infinity.
    NearPosInf = 1,
    /// Always toward -infinity (plain arithmetic shift).
    DirectNegInf = 2,
    /// Nearest; ties toward zero.
    NearZero = 3,
    /// Always toward zero (truncate the magnitude).
    DirectZero = 4,
    /// Nearest; ties to the even neighbor.
    NearEven = 5,
}

impl OverflowMode {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl RoundMode {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OverflowMode {
    type Error = FpError;

    fn try_from(v: u8) -> Result<Self, FpError> {
        match v {
            0 => Ok(OverflowMode::Wrap),
            1 => Ok(OverflowMode::Saturate),
            2 => Ok(OverflowMode::Exception),
            other => Err(FpError::UnknownMode(other)),
        }
    }
}

impl TryFrom<u8> for RoundMode {
    type Error = FpError;

    fn try_from(v: u8) -> Result<Self, FpError> {
        match v {
            1 => Ok(RoundMode::NearPosInf),
            2 => Ok(RoundMode::DirectNegInf),
            3 => Ok(RoundMode::NearZero),
            4 => Ok(RoundMode::DirectZero),
            5 => Ok(RoundMode::NearEven),
            other => Err(FpError::UnknownMode(other)),
        }
    }
}

/// Overflow and rounding policy for a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizePolicy {
    pub overflow: OverflowMode,
    pub round: RoundMode,
}

impl QuantizePolicy {
    pub const fn new(overflow: OverflowMode, round: RoundMode) -> Self {
        QuantizePolicy { overflow, round }
    }

    /// The policy applied when quantizing host floats at construction:
    /// clamp out-of-range values, round halves up.
    pub const fn saturating() -> Self {
        QuantizePolicy {
            overflow: OverflowMode::Saturate,
            round: RoundMode::NearPosInf,
        }
    }
}

impl Default for QuantizePolicy {
    fn default() -> Self {
        // Hardware resize defaults: keep low bits, floor.
        QuantizePolicy {
            overflow: OverflowMode::Wrap,
            round: RoundMode::DirectNegInf,
        }
    }
}
