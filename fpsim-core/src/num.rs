//! The dispatching fixed-point value.
//!
//! [`FpNum`] wraps one of the two engines and is the only arithmetic type
//! callers touch. It decides the backing engine at construction, promotes
//! word values to arbitrary precision whenever a growth rule would pass
//! the word ceiling, and demotes back on `resize` once the field fits the
//! word again. Mixed-sign and mixed-engine operands are normalized here
//! before any engine sees them, so the engines only ever meet matched
//! pairs.
//!
//! Arithmetic is lossless by construction; `resize` is the single lossy
//! operator. Operators panic only where native integer operators would
//! (zero denominator) or on a non-finite float operand; the `checked_*`
//! methods surface those as [`FpError`] instead.

use crate::bits::{self, to_shift, WORD_BITS};
use crate::error::FpError;
use crate::format::Format;
use crate::large::FpLarge;
use crate::policy::QuantizePolicy;
use crate::small::FpSmall;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Neg, Shl, Shr, Sub, SubAssign,
};
use tracing::trace;

#[derive(Clone, Debug)]
pub(crate) enum Repr {
    Small(FpSmall),
    Large(FpLarge),
}

/// A binary fixed-point number with explicit format and signedness.
#[derive(Clone)]
pub struct FpNum {
    pub(crate) repr: Repr,
}

#[derive(Clone, Copy, Debug)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl FpNum {
    /// Zero in the given format.
    pub fn new(format: Format, signed: bool) -> FpNum {
        if fits_word(format) {
            FpNum {
                repr: Repr::Small(FpSmall::zero(format, signed)),
            }
        } else {
            FpNum {
                repr: Repr::Large(FpLarge::zero(format, signed)),
            }
        }
    }

    /// Quantize a finite double into the format: exact decomposition
    /// first, then saturate and round halves up.
    pub fn from_float(x: f64, format: Format, signed: bool) -> Result<FpNum, FpError> {
        let p = bits::float_params(x)?;
        Ok(Self::quantized(p.scaled, p.frac_bits, format, signed))
    }

    /// Quantize a host integer into the format (saturating).
    pub fn from_int(n: i64, format: Format, signed: bool) -> FpNum {
        let p = bits::int_params(n);
        Self::quantized(p.scaled, p.frac_bits, format, signed)
    }

    /// Adopt a raw two's-complement bit pattern, masked to the field.
    pub fn from_bit_field(raw: impl Into<BigUint>, format: Format, signed: bool) -> FpNum {
        let raw = raw.into();
        if fits_word(format) {
            let word = raw.iter_u64_digits().next().unwrap_or(0);
            FpNum {
                repr: Repr::Small(FpSmall::from_bit_field(format, signed, word)),
            }
        } else {
            FpNum {
                repr: Repr::Large(FpLarge::from_bit_field(format, signed, raw)),
            }
        }
    }

    /// The smallest signed value exactly equal to `x`.
    pub fn from_float_minimal(x: f64) -> Result<FpNum, FpError> {
        let p = bits::float_params(x)?;
        let format = Format::new(p.int_bits, p.frac_bits)?;
        Ok(Self::exact(p.scaled, format))
    }

    /// The smallest signed value exactly equal to `n`.
    pub fn from_int_minimal(n: i64) -> FpNum {
        let p = bits::int_params(n);
        // int_bits + 1 fractional-free bits always form a valid format.
        let format = Format::new_unchecked(p.int_bits, p.frac_bits);
        Self::exact(p.scaled, format)
    }

    /// Quantize `x` using another value's format and signedness.
    pub fn with_format_of(x: f64, other: &FpNum) -> Result<FpNum, FpError> {
        Self::from_float(x, other.format(), other.is_signed())
    }

    /// Largest representable value of a format.
    pub fn max_value(format: Format, signed: bool) -> FpNum {
        if fits_word(format) {
            let v = bits::max_scaled(format.total_bits() as u32, signed);
            FpNum {
                repr: Repr::Small(FpSmall::from_value(format, signed, v)),
            }
        } else {
            let v = bits::max_scaled_big(format.total_bits() as u64, signed);
            FpNum {
                repr: Repr::Large(FpLarge::from_value(format, signed, v)),
            }
        }
    }

    /// Smallest representable value of a format.
    pub fn min_value(format: Format, signed: bool) -> FpNum {
        if fits_word(format) {
            let v = bits::min_scaled(format.total_bits() as u32, signed);
            FpNum {
                repr: Repr::Small(FpSmall::from_value(format, signed, v)),
            }
        } else {
            let v = bits::min_scaled_big(format.total_bits() as u64, signed);
            FpNum {
                repr: Repr::Large(FpLarge::from_value(format, signed, v)),
            }
        }
    }

    fn quantized(scaled: i64, src_frac: i64, format: Format, signed: bool) -> FpNum {
        if fits_word(format) {
            FpNum {
                repr: Repr::Small(FpSmall::quantize_exact(
                    i128::from(scaled),
                    src_frac,
                    format,
                    signed,
                )),
            }
        } else {
            FpNum {
                repr: Repr::Large(FpLarge::quantize_exact(
                    BigInt::from(scaled),
                    src_frac,
                    format,
                    signed,
                )),
            }
        }
    }

    fn exact(scaled: i64, format: Format) -> FpNum {
        if fits_word(format) {
            FpNum {
                repr: Repr::Small(FpSmall::from_value(format, true, i128::from(scaled))),
            }
        } else {
            FpNum {
                repr: Repr::Large(FpLarge::from_value(format, true, BigInt::from(scaled))),
            }
        }
    }

    #[inline]
    pub fn format(&self) -> Format {
        match &self.repr {
            Repr::Small(s) => s.format(),
            Repr::Large(l) => l.format(),
        }
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        match &self.repr {
            Repr::Small(s) => s.is_signed(),
            Repr::Large(l) => l.is_signed(),
        }
    }

    #[inline]
    pub fn int_bits(&self) -> i64 {
        self.format().int_bits()
    }

    #[inline]
    pub fn frac_bits(&self) -> i64 {
        self.format().frac_bits()
    }

    /// Width of the two's-complement field, `I + F`.
    #[inline]
    pub fn total_bits(&self) -> i64 {
        self.format().total_bits()
    }

    /// Whether the value currently rides the native word engine.
    #[inline]
    pub fn is_word_backed(&self) -> bool {
        matches!(self.repr, Repr::Small(_))
    }

    /// The two's-complement bit pattern of the field.
    pub fn bit_field(&self) -> BigUint {
        match &self.repr {
            Repr::Small(s) => BigUint::from(s.pattern()),
            Repr::Large(l) => l.pattern(),
        }
    }

    /// The scaled integer under sign interpretation.
    pub fn scaled_value(&self) -> BigInt {
        match &self.repr {
            Repr::Small(s) => BigInt::from(s.value()),
            Repr::Large(l) => l.value().clone(),
        }
    }

    /// Approximate double view; exactness is not guaranteed beyond the
    /// double's 53-bit significand.
    pub fn to_f64(&self) -> f64 {
        let scaled = match &self.repr {
            Repr::Small(s) => s.value() as f64,
            Repr::Large(l) => l.value().to_f64().unwrap_or(f64::NAN),
        };
        let exp = (-self.frac_bits()).clamp(-4096, 4096) as i32;
        scaled * (2f64).powi(exp)
    }

    /// Integer part, truncated toward zero, exact.
    pub fn to_int_exact(&self) -> BigInt {
        let v = self.scaled_value();
        let f = self.frac_bits();
        if f <= 0 {
            v << to_shift(-f)
        } else {
            // num-bigint division truncates toward zero.
            v / (BigInt::one() << to_shift(f))
        }
    }

    /// Integer part, truncated toward zero, saturating at the i64 range.
    pub fn to_int(&self) -> i64 {
        let exact = self.to_int_exact();
        exact.to_i64().unwrap_or(if exact.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// An equal signed value; unsigned inputs grow one integer bit to make
    /// room for the sign.
    pub fn to_signed(&self) -> FpNum {
        if self.is_signed() {
            return self.clone();
        }
        let format = Format::new_unchecked(self.int_bits() + 1, self.frac_bits());
        match &self.repr {
            Repr::Small(s) if fits_word(format) => FpNum {
                repr: Repr::Small(FpSmall::from_value(format, true, s.value())),
            },
            Repr::Small(s) => FpNum {
                repr: Repr::Large(FpLarge::from_value(
                    format,
                    true,
                    BigInt::from(s.value()),
                )),
            },
            Repr::Large(l) => FpNum {
                repr: Repr::Large(FpLarge::from_value(format, true, l.value().clone())),
            },
        }
    }

    fn to_large(&self) -> FpLarge {
        match &self.repr {
            Repr::Small(s) => FpLarge::from_small(s),
            Repr::Large(l) => l.clone(),
        }
    }

    /// Normalize a pair for delegation: matched signedness first, matched
    /// engines later (the op decides whether the word engine suffices).
    fn prepared(&self, other: &FpNum) -> (FpNum, FpNum) {
        let mut a = self.clone();
        let mut b = other.clone();
        if a.is_signed() != b.is_signed() {
            if a.is_signed() {
                b = b.to_signed();
            } else {
                a = a.to_signed();
            }
        }
        (a, b)
    }

    fn binary(&self, other: &FpNum, op: BinOp) -> Result<FpNum, FpError> {
        let (a, b) = self.prepared(other);
        if let (Repr::Small(x), Repr::Small(y)) = (&a.repr, &b.repr) {
            let ceiling = match op {
                BinOp::Add | BinOp::Sub => x.format().add_growth(&y.format()).total_bits(),
                BinOp::Mul => x.format().mul_growth(&y.format()).total_bits(),
                // Divide pays for the quotient's full width up front.
                BinOp::Div => x.format().total_bits() + y.format().total_bits() + 1,
            };
            if ceiling <= i64::from(WORD_BITS) {
                let r = match op {
                    BinOp::Add => x.add(y)?,
                    BinOp::Sub => x.sub(y)?,
                    BinOp::Mul => x.mul(y)?,
                    BinOp::Div => x.div(y)?,
                };
                return Ok(FpNum {
                    repr: Repr::Small(r),
                });
            }
            trace!(?op, ceiling, "promoting to the arbitrary-precision engine");
        }
        let x = a.to_large();
        let y = b.to_large();
        let r = match op {
            BinOp::Add => x.add(&y),
            BinOp::Sub => x.sub(&y),
            BinOp::Mul => x.mul(&y),
            BinOp::Div => x.div(&y)?,
        };
        Ok(FpNum {
            repr: Repr::Large(r),
        })
    }

    pub fn checked_add(&self, other: &FpNum) -> Result<FpNum, FpError> {
        self.binary(other, BinOp::Add)
    }

    pub fn checked_sub(&self, other: &FpNum) -> Result<FpNum, FpError> {
        self.binary(other, BinOp::Sub)
    }

    pub fn checked_mul(&self, other: &FpNum) -> Result<FpNum, FpError> {
        self.binary(other, BinOp::Mul)
    }

    /// Division; the only arithmetic that can fail for a value reason.
    pub fn checked_div(&self, other: &FpNum) -> Result<FpNum, FpError> {
        self.binary(other, BinOp::Div)
    }

    pub fn checked_neg(&self) -> Result<FpNum, FpError> {
        match &self.repr {
            Repr::Small(s) if fits_word(s.format().neg_growth()) => Ok(FpNum {
                repr: Repr::Small(s.neg()?),
            }),
            Repr::Small(s) => {
                trace!("promoting negation to the arbitrary-precision engine");
                Ok(FpNum {
                    repr: Repr::Large(FpLarge::from_small(s).neg()),
                })
            }
            Repr::Large(l) => Ok(FpNum {
                repr: Repr::Large(l.neg()),
            }),
        }
    }

    /// Magnitude; grows one integer bit only when the value is negative.
    pub fn checked_abs(&self) -> Result<FpNum, FpError> {
        match &self.repr {
            Repr::Small(s) if fits_word(s.format().neg_growth()) => Ok(FpNum {
                repr: Repr::Small(s.abs()?),
            }),
            Repr::Small(s) => Ok(FpNum {
                repr: Repr::Large(FpLarge::from_small(s).abs()),
            }),
            Repr::Large(l) => Ok(FpNum {
                repr: Repr::Large(l.abs()),
            }),
        }
    }

    pub fn abs(&self) -> FpNum {
        self.checked_abs()
            .unwrap_or_else(|err| panic!("fixed-point abs failed: {err}"))
    }

    /// Quantize in place. The single lossy operator: fractional bits fall
    /// per `policy.round`, then the range check applies `policy.overflow`.
    /// Demotes back to the word engine when the new field fits.
    pub fn resize(
        &mut self,
        format: Format,
        policy: QuantizePolicy,
    ) -> Result<(), FpError> {
        let word_target = fits_word(format);
        let next = match &mut self.repr {
            Repr::Small(s) if word_target => {
                s.resize(format, policy)?;
                None
            }
            Repr::Small(s) => {
                trace!(%format, "resize promoted to the arbitrary-precision engine");
                let mut l = FpLarge::from_small(s);
                l.resize(format, policy)?;
                Some(Repr::Large(l))
            }
            Repr::Large(l) => {
                l.resize(format, policy)?;
                if word_target {
                    trace!(%format, "resize demoted to the word engine");
                    Some(Repr::Small(FpSmall::from_bit_field(
                        format,
                        l.is_signed(),
                        l.word_pattern(),
                    )))
                } else {
                    None
                }
            }
        };
        if let Some(repr) = next {
            self.repr = repr;
        }
        Ok(())
    }

    /// Lossless widening to a superset format. Fails if either field of
    /// `format` is narrower than the current one.
    pub fn grow_to(&self, format: Format) -> Result<FpNum, FpError> {
        if format.int_bits() < self.int_bits() || format.frac_bits() < self.frac_bits() {
            return Err(FpError::InvalidFormat {
                int_bits: format.int_bits(),
                frac_bits: format.frac_bits(),
            });
        }
        let mut v = self.clone();
        // Pure growth cannot round or overflow, so any policy would do.
        v.resize(format, QuantizePolicy::default())?;
        Ok(v)
    }

    /// Exact value ordering, independent of format, signedness or engine.
    pub fn cmp_value(&self, other: &FpNum) -> Ordering {
        match (&self.repr, &other.repr) {
            (Repr::Small(a), Repr::Small(b)) => match a.try_cmp(b) {
                Some(o) => o,
                None => FpLarge::from_small(a).cmp_value(&FpLarge::from_small(b)),
            },
            _ => self.to_large().cmp_value(&other.to_large()),
        }
    }

    /// Bit `k` of the two's-complement field; bit 0 is the LSB of the
    /// fractional part.
    ///
    /// # Panics
    ///
    /// If `k` is outside `0..total_bits`, like slice indexing.
    pub fn bit(&self, k: u64) -> bool {
        let total = self.total_bits() as u64;
        assert!(k < total, "bit index {k} out of range for a {total}-bit value");
        match &self.repr {
            Repr::Small(s) => bits::rshift(s.pattern(), k as u32) & 1 == 1,
            Repr::Large(l) => !((l.pattern() >> k as usize) & BigUint::one()).is_zero(),
        }
    }

    /// Extract bits `[lo, hi)` as a fresh unsigned `(hi - lo, 0)` value.
    ///
    /// The bounds swap when given in descending hardware order, and the
    /// high end rails to the field width.
    pub fn slice_bits(&self, a: u64, b: u64) -> Result<FpNum, FpError> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let total = self.total_bits() as u64;
        let hi = hi.min(total);
        if lo >= hi {
            return Err(FpError::EmptySlice { lo: a, hi: b });
        }
        let width = (hi - lo) as i64;
        let format = Format::new_unchecked(width, 0);
        match &self.repr {
            Repr::Small(s) => {
                let raw = bits::rshift(s.pattern(), lo as u32) & bits::field_mask(width as u32);
                Ok(FpNum::from_bit_field(raw, format, false))
            }
            Repr::Large(l) => {
                let raw = l.pattern() >> lo as usize;
                Ok(FpNum::from_bit_field(raw, format, false))
            }
        }
    }

    fn binary_or_panic(&self, other: &FpNum, op: BinOp) -> FpNum {
        self.binary(other, op)
            .unwrap_or_else(|err| panic!("fixed-point {op:?} failed: {err}"))
    }
}

#[inline]
fn fits_word(format: Format) -> bool {
    format.total_bits() <= i64::from(WORD_BITS)
}

// ============================================================================
// Operator surface
// ============================================================================

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&FpNum> for &FpNum {
            type Output = FpNum;
            fn $method(self, rhs: &FpNum) -> FpNum {
                self.binary_or_panic(rhs, $op)
            }
        }

        impl $trait<FpNum> for &FpNum {
            type Output = FpNum;
            fn $method(self, rhs: FpNum) -> FpNum {
                self.binary_or_panic(&rhs, $op)
            }
        }

        impl $trait<&FpNum> for FpNum {
            type Output = FpNum;
            fn $method(self, rhs: &FpNum) -> FpNum {
                self.binary_or_panic(rhs, $op)
            }
        }

        impl $trait for FpNum {
            type Output = FpNum;
            fn $method(self, rhs: FpNum) -> FpNum {
                self.binary_or_panic(&rhs, $op)
            }
        }

        impl $trait<f64> for &FpNum {
            type Output = FpNum;
            fn $method(self, rhs: f64) -> FpNum {
                let rhs = FpNum::from_float_minimal(rhs)
                    .unwrap_or_else(|err| panic!("fixed-point operand: {err}"));
                self.binary_or_panic(&rhs, $op)
            }
        }

        impl $trait<f64> for FpNum {
            type Output = FpNum;
            fn $method(self, rhs: f64) -> FpNum {
                (&self).$method(rhs)
            }
        }

        impl $trait<&FpNum> for f64 {
            type Output = FpNum;
            fn $method(self, rhs: &FpNum) -> FpNum {
                let lhs = FpNum::from_float_minimal(self)
                    .unwrap_or_else(|err| panic!("fixed-point operand: {err}"));
                lhs.binary_or_panic(rhs, $op)
            }
        }

        impl $trait<FpNum> for f64 {
            type Output = FpNum;
            fn $method(self, rhs: FpNum) -> FpNum {
                self.$method(&rhs)
            }
        }

        impl $trait<i64> for &FpNum {
            type Output = FpNum;
            fn $method(self, rhs: i64) -> FpNum {
                self.binary_or_panic(&FpNum::from_int_minimal(rhs), $op)
            }
        }

        impl $trait<i64> for FpNum {
            type Output = FpNum;
            fn $method(self, rhs: i64) -> FpNum {
                (&self).$method(rhs)
            }
        }

        impl $trait<&FpNum> for i64 {
            type Output = FpNum;
            fn $method(self, rhs: &FpNum) -> FpNum {
                FpNum::from_int_minimal(self).binary_or_panic(rhs, $op)
            }
        }

        impl $trait<FpNum> for i64 {
            type Output = FpNum;
            fn $method(self, rhs: FpNum) -> FpNum {
                self.$method(&rhs)
            }
        }
    };
}

impl_binary_operator!(Add, add, BinOp::Add);
impl_binary_operator!(Sub, sub, BinOp::Sub);
impl_binary_operator!(Mul, mul, BinOp::Mul);
impl_binary_operator!(Div, div, BinOp::Div);

// In-place forms rebind to the grown result, like every other op.
macro_rules! impl_assign_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&FpNum> for FpNum {
            fn $method(&mut self, rhs: &FpNum) {
                *self = self.binary_or_panic(rhs, $op);
            }
        }

        impl $trait for FpNum {
            fn $method(&mut self, rhs: FpNum) {
                *self = self.binary_or_panic(&rhs, $op);
            }
        }

        impl $trait<f64> for FpNum {
            fn $method(&mut self, rhs: f64) {
                let rhs = FpNum::from_float_minimal(rhs)
                    .unwrap_or_else(|err| panic!("fixed-point operand: {err}"));
                *self = self.binary_or_panic(&rhs, $op);
            }
        }

        impl $trait<i64> for FpNum {
            fn $method(&mut self, rhs: i64) {
                *self = self.binary_or_panic(&FpNum::from_int_minimal(rhs), $op);
            }
        }
    };
}

impl_assign_operator!(AddAssign, add_assign, BinOp::Add);
impl_assign_operator!(SubAssign, sub_assign, BinOp::Sub);
impl_assign_operator!(MulAssign, mul_assign, BinOp::Mul);
impl_assign_operator!(DivAssign, div_assign, BinOp::Div);

impl Neg for &FpNum {
    type Output = FpNum;
    fn neg(self) -> FpNum {
        self.checked_neg()
            .unwrap_or_else(|err| panic!("fixed-point negation failed: {err}"))
    }
}

impl Neg for FpNum {
    type Output = FpNum;
    fn neg(self) -> FpNum {
        -&self
    }
}

impl Shl<u32> for &FpNum {
    type Output = FpNum;
    fn shl(self, n: u32) -> FpNum {
        match &self.repr {
            Repr::Small(s) => FpNum {
                repr: Repr::Small(s.shl(n)),
            },
            Repr::Large(l) => FpNum {
                repr: Repr::Large(l.shl(n)),
            },
        }
    }
}

impl Shl<u32> for FpNum {
    type Output = FpNum;
    fn shl(self, n: u32) -> FpNum {
        &self << n
    }
}

impl Shr<u32> for &FpNum {
    type Output = FpNum;
    fn shr(self, n: u32) -> FpNum {
        match &self.repr {
            Repr::Small(s) => FpNum {
                repr: Repr::Small(s.shr(n)),
            },
            Repr::Large(l) => FpNum {
                repr: Repr::Large(l.shr(n)),
            },
        }
    }
}

impl Shr<u32> for FpNum {
    type Output = FpNum;
    fn shr(self, n: u32) -> FpNum {
        &self >> n
    }
}

// ============================================================================
// Comparisons
// ============================================================================

impl PartialEq for FpNum {
    fn eq(&self, other: &FpNum) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }
}

impl Eq for FpNum {}

impl PartialOrd for FpNum {
    fn partial_cmp(&self, other: &FpNum) -> Option<Ordering> {
        Some(self.cmp_value(other))
    }
}

impl Ord for FpNum {
    fn cmp(&self, other: &FpNum) -> Ordering {
        self.cmp_value(other)
    }
}

impl PartialEq<f64> for FpNum {
    fn eq(&self, other: &f64) -> bool {
        match FpNum::from_float_minimal(*other) {
            Ok(v) => self.cmp_value(&v) == Ordering::Equal,
            Err(_) => false,
        }
    }
}

impl PartialOrd<f64> for FpNum {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        FpNum::from_float_minimal(*other)
            .ok()
            .map(|v| self.cmp_value(&v))
    }
}

impl PartialEq<FpNum> for f64 {
    fn eq(&self, other: &FpNum) -> bool {
        other == self
    }
}

impl PartialOrd<FpNum> for f64 {
    fn partial_cmp(&self, other: &FpNum) -> Option<Ordering> {
        other.partial_cmp(self).map(Ordering::reverse)
    }
}

impl PartialEq<i64> for FpNum {
    fn eq(&self, other: &i64) -> bool {
        self.cmp_value(&FpNum::from_int_minimal(*other)) == Ordering::Equal
    }
}

impl PartialOrd<i64> for FpNum {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        Some(self.cmp_value(&FpNum::from_int_minimal(*other)))
    }
}

impl PartialEq<FpNum> for i64 {
    fn eq(&self, other: &FpNum) -> bool {
        other == self
    }
}

impl PartialOrd<FpNum> for i64 {
    fn partial_cmp(&self, other: &FpNum) -> Option<Ordering> {
        other.partial_cmp(self).map(Ordering::reverse)
    }
}

// ============================================================================
// Indexing and rendering
// ============================================================================

static BIT_SET: bool = true;
static BIT_CLEAR: bool = false;

impl Index<usize> for FpNum {
    type Output = bool;

    fn index(&self, k: usize) -> &bool {
        if self.bit(k as u64) {
            &BIT_SET
        } else {
            &BIT_CLEAR
        }
    }
}

impl fmt::Display for FpNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = bits::decimal_string(&self.scaled_value(), self.frac_bits());
        f.write_str(&text)
    }
}

impl fmt::Debug for FpNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = if self.is_word_backed() { "word" } else { "big" };
        let sign = if self.is_signed() { "signed" } else { "unsigned" };
        write!(
            f,
            "FpNum({} {} {}, scaled {} = {})",
            sign,
            self.format(),
            engine,
            self.scaled_value(),
            self
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{OverflowMode, RoundMode};

    fn fmt(i: i64, f: i64) -> Format {
        Format::new(i, f).unwrap()
    }

    #[test]
    fn engine_choice_follows_the_word_ceiling() {
        assert!(FpNum::new(fmt(32, 32), true).is_word_backed());
        assert!(!FpNum::new(fmt(33, 32), true).is_word_backed());
    }

    #[test]
    fn float_construction_quantizes_with_saturation() {
        let v = FpNum::from_float(2.5, fmt(4, 4), true).unwrap();
        assert_eq!(v.scaled_value(), BigInt::from(40));

        // Out of range saturates instead of wrapping.
        let v = FpNum::from_float(100.0, fmt(4, 0), true).unwrap();
        assert_eq!(v.scaled_value(), BigInt::from(7));
        let v = FpNum::from_float(-100.0, fmt(4, 0), true).unwrap();
        assert_eq!(v.scaled_value(), BigInt::from(-8));

        // Quantization rounds halves toward +infinity.
        let v = FpNum::from_float(0.0625, fmt(4, 3), true).unwrap();
        assert_eq!(v.scaled_value(), BigInt::from(1));

        assert!(matches!(
            FpNum::from_float(f64::NAN, fmt(4, 4), true),
            Err(FpError::NonFinite)
        ));
    }

    #[test]
    fn minimal_constructors_are_exact() {
        let v = FpNum::from_float_minimal(2.5).unwrap();
        assert_eq!(v.format(), fmt(3, 1));
        assert_eq!(v.to_f64(), 2.5);

        let v = FpNum::from_int_minimal(-6);
        assert_eq!(v.format(), fmt(4, 0));
        assert_eq!(v.to_int(), -6);

        // i64::MIN needs 65 bits and lands on the big engine.
        let v = FpNum::from_int_minimal(i64::MIN);
        assert!(!v.is_word_backed());
        assert_eq!(v.to_int(), i64::MIN);
    }

    #[test]
    fn addition_grows_and_aligns() {
        let a = FpNum::from_float(2.5, fmt(4, 2), true).unwrap();
        let b = FpNum::from_float(0.375, fmt(1, 3), true).unwrap();
        let r = &a + &b;
        assert_eq!(r.format(), fmt(5, 3));
        assert_eq!(r, 2.875);
    }

    #[test]
    fn host_operands_get_minimal_formats() {
        let v = FpNum::from_float(2.5, fmt(4, 4), true).unwrap();
        let r = &v * 2.0;
        assert_eq!(r, 5.0);
        let r = &v + 1i64;
        assert_eq!(r, 3.5);
        let r = 10.0 - &v;
        assert_eq!(r, 7.5);
        let r = 5i64 * &v;
        assert_eq!(r, 12.5);
    }

    #[test]
    fn mixed_sign_operands_promote_the_unsigned_side() {
        let s = FpNum::from_float(3.0, fmt(4, 2), true).unwrap();
        let u = FpNum::from_float(5.0, fmt(4, 2), false).unwrap();
        let r = &s + &u;
        assert!(r.is_signed());
        // Unsigned (4, 2) became signed (5, 2); growth adds one more.
        assert_eq!(r.format(), fmt(6, 2));
        assert_eq!(r, 8.0);
    }

    #[test]
    fn word_ceiling_promotes_instead_of_failing() {
        let a = FpNum::from_bit_field((1u64 << 38) + 12345, fmt(40, 0), true);
        let b = FpNum::from_bit_field((1u64 << 37) + 999, fmt(40, 0), true);
        let r = &a * &b;
        assert!(!r.is_word_backed());
        assert_eq!(r.format(), fmt(80, 0));
        let expect =
            BigInt::from((1i128 << 38) + 12345) * BigInt::from((1i128 << 37) + 999);
        assert_eq!(r.scaled_value(), expect);
    }

    #[test]
    fn divide_ceiling_is_conservative() {
        // 32 + 31 + 1 = 64 stays on the word engine.
        let a = FpNum::new(fmt(32, 0), true);
        let b = FpNum::new(fmt(31, 0), true);
        let r = a.checked_div(&b.checked_add(&FpNum::from_int_minimal(1)).unwrap());
        // b grew to (32, 0) in the add; 32 + 32 + 1 > 64 promotes.
        assert!(!r.unwrap().is_word_backed());

        let c = FpNum::from_int(3, fmt(31, 0), true);
        let q = FpNum::from_int(12, fmt(32, 0), true).checked_div(&c).unwrap();
        assert!(q.is_word_backed());
        assert_eq!(q.format(), fmt(32 + 0 + 1, 0 + 31));
    }

    #[test]
    fn division_by_zero() {
        let a = FpNum::from_int(1, fmt(4, 0), true);
        let zero = FpNum::new(fmt(4, 0), true);
        assert!(matches!(
            a.checked_div(&zero),
            Err(FpError::DivisionByZero)
        ));
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn division_operator_panics_on_zero() {
        let a = FpNum::from_int(1, fmt(4, 0), true);
        let zero = FpNum::new(fmt(4, 0), true);
        let _ = &a / &zero;
    }

    #[test]
    fn negation_of_the_most_negative_value() {
        let v = FpNum::min_value(fmt(4, 0), true);
        let r = -&v;
        assert_eq!(r.format(), fmt(5, 0));
        assert_eq!(r, 8i64);
    }

    #[test]
    fn abs_formats_depend_on_sign() {
        let v = FpNum::from_int(-8, fmt(4, 0), true);
        assert_eq!(v.abs().format(), fmt(5, 0));
        let v = FpNum::from_int(7, fmt(4, 0), true);
        assert_eq!(v.abs().format(), fmt(4, 0));
    }

    #[test]
    fn shifts_preserve_format_and_wrap_bits() {
        let v = FpNum::from_bit_field(0x25u64, fmt(4, 4), true);
        let l = &v << 2;
        assert_eq!(l.format(), fmt(4, 4));
        assert_eq!(l.bit_field(), BigUint::from(0x94u32));
        let r = &l >> 2;
        assert_eq!(r.scaled_value(), BigInt::from(-27));
    }

    #[test]
    fn resize_demotes_once_the_field_fits() {
        let mut v = FpNum::from_bit_field(BigUint::from(1u8) << 70, fmt(80, 0), true);
        assert!(!v.is_word_backed());
        v.resize(
            fmt(8, 0),
            QuantizePolicy::new(OverflowMode::Saturate, RoundMode::DirectNegInf),
        )
        .unwrap();
        assert!(v.is_word_backed());
        assert_eq!(v, 127i64);
    }

    #[test]
    fn resize_promotes_when_the_target_is_wide() {
        let mut v = FpNum::from_int(3, fmt(8, 0), true);
        v.resize(fmt(80, 8), QuantizePolicy::default()).unwrap();
        assert!(!v.is_word_backed());
        assert_eq!(v, 3i64);
    }

    #[test]
    fn comparisons_cross_engines_and_signs() {
        let small = FpNum::from_int(5, fmt(8, 0), true);
        let mut large = FpNum::from_int(5, fmt(8, 0), true);
        large.resize(fmt(80, 4), QuantizePolicy::default()).unwrap();
        assert_eq!(small, large);

        let unsigned = FpNum::from_int(5, fmt(8, 0), false);
        assert_eq!(small, unsigned);
        assert!(small < FpNum::from_float_minimal(5.25).unwrap());
        assert!(FpNum::from_int(-1, fmt(4, 0), true) < unsigned);
    }

    #[test]
    fn exact_comparison_beyond_double_precision() {
        // 2^60 and 2^60 + 1 collapse to the same double but must compare
        // unequal here.
        let base = FpNum::from_bit_field(1u64 << 60, fmt(62, 0), true);
        let bumped = FpNum::from_bit_field((1u64 << 60) + 1, fmt(62, 0), true);
        assert_ne!(base, bumped);
        assert!(base < bumped);
        assert_eq!(base.to_f64(), bumped.to_f64());
    }

    #[test]
    fn indexing_reads_field_bits() {
        let v = FpNum::from_bit_field(0xA5u64, fmt(4, 4), true);
        assert!(v[0]);
        assert!(!v[1]);
        assert!(v[2]);
        assert!(v[7]);
        assert_eq!(v.total_bits(), 8);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn indexing_past_the_field_panics() {
        let v = FpNum::from_bit_field(0xA5u64, fmt(4, 4), true);
        let _ = v[8];
    }

    #[test]
    fn slicing_yields_unsigned_fields() {
        let v = FpNum::from_bit_field(0xA5u64, fmt(4, 4), true);
        let low = v.slice_bits(0, 4).unwrap();
        assert_eq!(low.format(), fmt(4, 0));
        assert!(!low.is_signed());
        assert_eq!(low, 5i64);

        let high = v.slice_bits(4, 8).unwrap();
        assert_eq!(high, 10i64);

        // Descending hardware order swaps.
        assert_eq!(v.slice_bits(8, 4).unwrap(), 10i64);
        // The high end rails to the field width.
        assert_eq!(v.slice_bits(4, 100).unwrap(), 10i64);
        assert!(v.slice_bits(3, 3).is_err());
    }

    #[test]
    fn display_is_exact_decimal() {
        let v = FpNum::from_bit_field(0xA5u64, fmt(4, 4), true);
        assert_eq!(v.to_string(), "-5.6875");
        let v = FpNum::from_float(5.0, fmt(4, 4), true).unwrap();
        assert_eq!(v.to_string(), "5.0");
        let v = FpNum::from_bit_field(1u64, fmt(62, -1), true);
        assert_eq!(v.to_string(), "2");

        // Sixty fractional bits stay exact, far beyond double precision:
        // 2^-60 renders as "0." plus all sixty digits of 5^60 / 10^60.
        let tiny = FpNum::from_bit_field(1u64, fmt(1, 60), true);
        assert!(tiny.to_string().ends_with("0625"));
        assert_eq!(tiny.to_string().len(), 2 + 60);
    }

    #[test]
    fn to_int_truncates_toward_zero() {
        let v = FpNum::from_float(-2.75, fmt(4, 4), true).unwrap();
        assert_eq!(v.to_int(), -2);
        let v = FpNum::from_float(2.75, fmt(4, 4), true).unwrap();
        assert_eq!(v.to_int(), 2);
    }

    #[test]
    fn assign_operators_rebind_to_the_grown_result() {
        let mut acc = FpNum::new(fmt(1, 0), true);
        acc += FpNum::from_float(2.5, fmt(4, 2), true).unwrap();
        acc += 1i64;
        acc *= 2.0;
        assert_eq!(acc, 7.0);
        acc -= 0.5;
        acc /= 2i64;
        assert_eq!(acc, 3.25);
        // Each step grew the format; nothing rounded.
        assert!(acc.frac_bits() >= 2);
    }

    #[test]
    fn bounds_constructors() {
        assert_eq!(FpNum::max_value(fmt(4, 0), true), 7i64);
        assert_eq!(FpNum::min_value(fmt(4, 0), true), -8i64);
        assert_eq!(FpNum::max_value(fmt(4, 0), false), 15i64);
        assert_eq!(
            FpNum::max_value(fmt(80, 0), true).scaled_value(),
            (BigInt::one() << 79) - 1
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Bit fields round-trip for arbitrary widths (word and big).
            #[test]
            fn bit_field_round_trips(
                raw in any::<u64>(),
                int_bits in 1i64..=80,
            ) {
                let f = Format::new(int_bits, 0).unwrap();
                let v = FpNum::from_bit_field(raw, f, true);
                let mask = if int_bits >= 64 {
                    u64::MAX
                } else {
                    (1u64 << int_bits) - 1
                };
                prop_assert_eq!(v.bit_field(), BigUint::from(raw & mask));
            }

            /// Associativity of lossless addition.
            #[test]
            fn add_associates(
                a in -1000i64..=1000,
                b in -1000i64..=1000,
                c in -1000i64..=1000,
            ) {
                let x = FpNum::from_int_minimal(a);
                let y = FpNum::from_int_minimal(b);
                let z = FpNum::from_int_minimal(c);
                let left = (&x + &y) + &z;
                let right = &x + (&y + &z);
                prop_assert_eq!(&left, &right);
                prop_assert_eq!(left, a + b + c);
            }

            /// Multiplication commutes in value and format.
            #[test]
            fn mul_commutes(a in any::<i32>(), b in any::<i32>()) {
                let x = FpNum::from_int_minimal(i64::from(a));
                let y = FpNum::from_int_minimal(i64::from(b));
                let xy = &x * &y;
                let yx = &y * &x;
                prop_assert_eq!(&xy, &yx);
                prop_assert_eq!(xy.format(), yx.format());
                prop_assert_eq!(xy, i64::from(a) * i64::from(b));
            }

            /// The word engine and the promoted path agree wherever both
            /// apply.
            #[test]
            fn promotion_is_transparent(
                a in -10_000i64..=10_000,
                b in -10_000i64..=10_000,
            ) {
                let x = FpNum::from_int_minimal(a);
                let y = FpNum::from_int_minimal(b);
                let native = &x * &y;

                let mut wx = x.clone();
                wx.resize(Format::new(70, 0).unwrap(), QuantizePolicy::default()).unwrap();
                let promoted = &wx * &y;
                prop_assert_eq!(native, promoted);
            }

            /// Resize to the same format is the identity for all modes.
            #[test]
            fn resize_idempotence(
                raw in any::<u64>(),
                round in 1u8..=5,
                overflow in 0u8..=2,
            ) {
                let f = Format::new(6, 6).unwrap();
                let mut v = FpNum::from_bit_field(raw, f, true);
                let before = v.scaled_value();
                v.resize(
                    f,
                    QuantizePolicy::new(
                        OverflowMode::try_from(overflow).unwrap(),
                        RoundMode::try_from(round).unwrap(),
                    ),
                )
                .unwrap();
                prop_assert_eq!(v.scaled_value(), before);
                prop_assert_eq!(v.format(), f);
            }

            /// Display text re-parses to the exact rational: text * 2^F
            /// recovers the scaled integer.
            #[test]
            fn display_round_trips(raw in any::<u64>(), frac in 0i64..=16) {
                let f = Format::new(16 - frac, frac).unwrap();
                let v = FpNum::from_bit_field(raw & 0xFFFF, f, true);
                let text = v.to_string();
                let negative = text.starts_with('-');
                let body = text.trim_start_matches('-');
                let (int_text, frac_text) = match body.split_once('.') {
                    Some((i, fr)) => (i, fr),
                    None => (body, ""),
                };
                let digits: i128 =
                    format!("{int_text}{frac_text}").parse().unwrap();
                let signed = if negative { -digits } else { digits };
                // signed / 10^len == scaled / 2^frac, cross-multiplied.
                let scaled: i128 = v.scaled_value().to_string().parse().unwrap();
                prop_assert_eq!(
                    signed * (1i128 << frac),
                    scaled * 10i128.pow(frac_text.len() as u32)
                );
            }
        }
    }
}
