//! Fixed-point formats and the deterministic growth rules.
//!
//! A format is the pair `(int_bits, frac_bits)`. Either count may be
//! negative; the only hard constraint is that the total field width is at
//! least one bit. A value of format `(I, F)` stores `value * 2^F` in an
//! `I + F` bit two's-complement field (signed) or unsigned field.

use crate::error::FpError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit layout of a fixed-point value: integer bits (sign included for
/// signed values) and fractional bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    int_bits: i64,
    frac_bits: i64,
}

impl Format {
    /// Create a format, rejecting totals below one bit.
    pub fn new(int_bits: i64, frac_bits: i64) -> Result<Self, FpError> {
        if int_bits.saturating_add(frac_bits) < 1 {
            return Err(FpError::InvalidFormat {
                int_bits,
                frac_bits,
            });
        }
        Ok(Format {
            int_bits,
            frac_bits,
        })
    }

    /// Construct without the width check. Growth-rule results are valid by
    /// construction; everything user-facing goes through [`Format::new`].
    pub(crate) const fn new_unchecked(int_bits: i64, frac_bits: i64) -> Self {
        Format {
            int_bits,
            frac_bits,
        }
    }

    #[inline]
    pub const fn int_bits(&self) -> i64 {
        self.int_bits
    }

    #[inline]
    pub const fn frac_bits(&self) -> i64 {
        self.frac_bits
    }

    /// Width of the two's-complement field, `I + F`.
    #[inline]
    pub const fn total_bits(&self) -> i64 {
        self.int_bits + self.frac_bits
    }

    /// Result format of `a + b` / `a - b`: one extra integer bit over the
    /// wider operand, fractional point at the finer operand.
    #[inline]
    pub fn add_growth(&self, other: &Format) -> Format {
        Format::new_unchecked(
            self.int_bits.max(other.int_bits) + 1,
            self.frac_bits.max(other.frac_bits),
        )
    }

    /// Result format of `a * b`: widths add on both sides of the point.
    #[inline]
    pub fn mul_growth(&self, other: &Format) -> Format {
        Format::new_unchecked(
            self.int_bits + other.int_bits,
            self.frac_bits + other.frac_bits,
        )
    }

    /// Result format of `a / b`. Signed division carries one extra integer
    /// bit (e.g. `MIN / -1` needs it); unsigned does not.
    #[inline]
    pub fn div_growth(&self, other: &Format, signed: bool) -> Format {
        let sign_bit = if signed { 1 } else { 0 };
        Format::new_unchecked(
            self.int_bits + other.frac_bits + sign_bit,
            self.frac_bits + other.int_bits,
        )
    }

    /// Result format of `-a`: one extra integer bit (negating the most
    /// negative value grows the magnitude).
    #[inline]
    pub fn neg_growth(&self) -> Format {
        Format::new_unchecked(self.int_bits + 1, self.frac_bits)
    }
}

impl TryFrom<(i64, i64)> for Format {
    type Error = FpError;

    fn try_from((int_bits, frac_bits): (i64, i64)) -> Result<Self, FpError> {
        Format::new(int_bits, frac_bits)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.int_bits, self.frac_bits)
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format({}, {})", self.int_bits, self.frac_bits)
    }
}
