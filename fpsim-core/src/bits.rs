//! Bit-level plumbing shared by both engines.
//!
//! Everything here treats the scaled integer as an explicit two's-complement
//! bit field. Sign interpretation is always arithmetic (compare against the
//! sign bit) — never a reinterpretation of host signed overflow behavior.

use crate::error::FpError;
use crate::policy::RoundMode;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Pow, Signed, Zero};

/// Native word width: formats at or below this total ride the word engine.
pub const WORD_BITS: u32 = u64::BITS;

/// `x << n`, yielding 0 once the shift covers the whole word.
#[inline]
pub fn lshift(x: u64, n: u32) -> u64 {
    if n >= WORD_BITS {
        0
    } else {
        x << n
    }
}

/// `x >> n`, yielding 0 once the shift covers the whole word.
#[inline]
pub fn rshift(x: u64, n: u32) -> u64 {
    if n >= WORD_BITS {
        0
    } else {
        x >> n
    }
}

/// The sign-bit mask of a `total`-bit field. `total` must be in `1..=64`.
#[inline]
pub fn sign_bit(total: u32) -> u64 {
    debug_assert!((1..=WORD_BITS).contains(&total));
    1u64 << (total - 1)
}

/// All-ones mask over the low `total` bits.
#[inline]
pub fn field_mask(total: u32) -> u64 {
    if total >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << total) - 1
    }
}

/// Replicate the sign bit of a `total`-bit field across the upper word.
#[inline]
pub fn sign_extend(x: u64, total: u32) -> u64 {
    let masked = x & field_mask(total);
    if total < WORD_BITS && masked & sign_bit(total) != 0 {
        masked | !field_mask(total)
    } else {
        masked
    }
}

/// Largest scaled integer a `total`-bit field holds. `total` in `1..=64`.
#[inline]
pub fn max_scaled(total: u32, signed: bool) -> i128 {
    if signed {
        (1i128 << (total - 1)) - 1
    } else {
        (1i128 << total) - 1
    }
}

/// Smallest scaled integer a `total`-bit field holds.
#[inline]
pub fn min_scaled(total: u32, signed: bool) -> i128 {
    if signed {
        -(1i128 << (total - 1))
    } else {
        0
    }
}

/// [`max_scaled`] without the word ceiling.
pub fn max_scaled_big(total: u64, signed: bool) -> BigInt {
    if signed {
        (BigInt::one() << (total - 1)) - 1
    } else {
        (BigInt::one() << total) - 1
    }
}

/// [`min_scaled`] without the word ceiling.
pub fn min_scaled_big(total: u64, signed: bool) -> BigInt {
    if signed {
        -(BigInt::one() << (total - 1))
    } else {
        BigInt::zero()
    }
}

/// Split a finite `x` into `(mantissa, exponent)` with the mantissa in
/// `[0.5, 1)` and `x == mantissa * 2^exponent`. Zero maps to `(0.0, 0)`.
pub fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exp_field = ((bits >> 52) & 0x7ff) as i32;
    if exp_field == 0 {
        // Subnormal: renormalize by 2^63 and recurse once.
        let scaled = x * f64::from_bits((1023u64 + 63) << 52);
        let (m, e) = frexp(scaled);
        return (m, e - 63);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, exp_field - 1022)
}

/// Minimal exact fixed-point decomposition of a host scalar: the scaled
/// integer together with the smallest signed format that represents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactParams {
    pub scaled: i64,
    pub int_bits: i64,
    pub frac_bits: i64,
}

/// Decompose a finite double exactly.
///
/// Doubles the frexp mantissa and peels the integer bit until nothing is
/// left; the iteration count is the precision in bits, bounded by the
/// double's 53-bit significand. `frac_bits` then places the scaled integer
/// so that `scaled / 2^frac_bits == x` with no error at all.
pub fn float_params(x: f64) -> Result<ExactParams, FpError> {
    if !x.is_finite() {
        return Err(FpError::NonFinite);
    }
    if x == 0.0 {
        return Ok(ExactParams {
            scaled: 0,
            int_bits: 1,
            frac_bits: 0,
        });
    }

    let (mut mantissa, exp) = frexp(x.abs());
    let mut magnitude: u64 = 0;
    let mut precision: i64 = 0;
    while mantissa != 0.0 {
        mantissa *= 2.0;
        magnitude <<= 1;
        if mantissa >= 1.0 {
            mantissa -= 1.0;
            magnitude |= 1;
        }
        precision += 1;
    }

    let scaled = if x < 0.0 {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    Ok(ExactParams {
        scaled,
        // One bit above the exponent for the sign.
        int_bits: exp as i64 + 1,
        frac_bits: precision - exp as i64,
    })
}

/// Minimal exact decomposition of a host integer: `n` itself scaled at
/// `frac_bits = 0`, with a sign bit on top of the magnitude width.
pub fn int_params(n: i64) -> ExactParams {
    let magnitude_bits = (u64::BITS - n.unsigned_abs().leading_zeros()) as i64;
    ExactParams {
        scaled: n,
        int_bits: magnitude_bits + 1,
        frac_bits: 0,
    }
}

/// Bit `k` of `v` in the infinite two's-complement view.
#[inline]
pub fn bit_at(v: i128, k: u32) -> bool {
    if k >= 127 {
        v < 0
    } else {
        (v >> k) & 1 == 1
    }
}

/// Whether any of bits `[0, k)` of `v` is set (two's-complement view).
#[inline]
pub fn low_bits_nonzero(v: i128, k: u32) -> bool {
    if k == 0 {
        false
    } else if k >= 127 {
        v != 0
    } else {
        v & ((1i128 << k) - 1) != 0
    }
}

/// Drop the low `drop` bits of `v`, disposing of them per `mode`.
///
/// This is the fractional-rescale step of a resize, expressed on the plain
/// scaled integer: the result is `v / 2^drop` rounded as requested.
pub fn round_shift(v: i128, drop: u32, mode: RoundMode) -> i128 {
    debug_assert!(drop > 0);
    let floor = v >> drop.min(127);
    let msb = bit_at(v, drop - 1);
    let lower = low_bits_nonzero(v, drop - 1);
    let negative = v < 0;

    let bump = match mode {
        RoundMode::DirectNegInf => false,
        RoundMode::NearPosInf => msb,
        RoundMode::DirectZero => negative && (msb || lower),
        RoundMode::NearZero => msb && (negative || lower),
        RoundMode::NearEven => msb && (lower || floor & 1 == 1),
    };
    floor + i128::from(bump)
}

/// [`round_shift`] over the arbitrary-precision engine's scaled integer.
pub fn round_shift_big(v: &BigInt, drop: u64, mode: RoundMode) -> BigInt {
    debug_assert!(drop > 0);
    let floor: BigInt = v >> drop;
    // num-bigint right shift floors, so the remainder is the non-negative
    // dropped-bit field.
    let dropped = v - (&floor << drop);
    let half: BigInt = BigInt::one() << (drop - 1);
    let msb = dropped >= half;
    let lower = if msb {
        dropped > half
    } else {
        !dropped.is_zero()
    };
    let negative = v.sign() == Sign::Minus;
    let odd = (&floor & BigInt::one()).is_one();

    let bump = match mode {
        RoundMode::DirectNegInf => false,
        RoundMode::NearPosInf => msb,
        RoundMode::DirectZero => negative && (msb || lower),
        RoundMode::NearZero => msb && (negative || lower),
        RoundMode::NearEven => msb && (lower || odd),
    };
    if bump {
        floor + 1
    } else {
        floor
    }
}

/// Exact decimal text of `scaled / 2^frac_bits`, never scientific notation.
///
/// The integer part splits off with a right shift; the remainder times
/// `5^F` gives the decimal fraction digits directly (since
/// `r / 2^F == r * 5^F / 10^F`). Trailing fractional zeros collapse, but a
/// fractional point stays whenever the format carries fractional bits.
pub fn decimal_string(scaled: &BigInt, frac_bits: i64) -> String {
    let negative = scaled.is_negative();
    let magnitude = scaled.magnitude().clone();

    if frac_bits <= 0 {
        let digits = magnitude << to_shift(-frac_bits);
        return if negative && !digits.is_zero() {
            format!("-{digits}")
        } else {
            digits.to_string()
        };
    }

    let f = frac_bits as u64;
    let int_part = &magnitude >> to_shift(frac_bits);
    let remainder = magnitude - (&int_part << to_shift(frac_bits));
    let frac_digits = (remainder * Pow::pow(BigUint::from(5u8), f)).to_string();

    let mut frac_text = format!("{frac_digits:0>width$}", width = f as usize);
    let trimmed = frac_text.trim_end_matches('0').len();
    frac_text.truncate(trimmed.max(1));

    let sign = if negative && !(int_part.is_zero() && frac_text == "0") {
        "-"
    } else {
        ""
    };
    format!("{sign}{int_part}.{frac_text}")
}

/// Shift-amount conversion for the arbitrary-precision paths. Values come
/// from format fields; anything that does not fit `usize` could never be
/// materialized anyway.
#[inline]
pub(crate) fn to_shift(n: i64) -> usize {
    debug_assert!(n >= 0);
    usize::try_from(n).unwrap_or(usize::MAX)
}
